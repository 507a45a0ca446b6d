//! Persistence of computed assessments. Storage is the caller's concern; the engine only hands
//! results over through `ResultStore`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::tax::{Assessment, TaxYear};

pub trait ResultStore {
    /// Upsert by `(user_id, tax_year)`; an existing result for the key is replaced
    fn save(&mut self, user_id: &str, tax_year: TaxYear, result: &Assessment)
        -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResult {
    pub user_id: String,
    pub tax_year: TaxYear,
    pub result: Assessment,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredResults {
    results: Vec<StoredResult>,
}

/// Results kept in a JSON file, rewritten on every save
#[derive(Debug)]
pub struct JsonResultStore {
    path: PathBuf,
    results: Vec<StoredResult>,
}

impl JsonResultStore {
    /// Open `path`, starting empty if the file does not exist yet
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let results = if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("failed to open results file {}", path.display()))?;
            let stored: StoredResults = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("invalid results file {}", path.display()))?;
            stored.results
        } else {
            Vec::new()
        };
        Ok(JsonResultStore {
            path: path.to_path_buf(),
            results,
        })
    }

    pub fn results(&self) -> &[StoredResult] {
        &self.results
    }

    pub fn get(&self, user_id: &str, tax_year: TaxYear) -> Option<&Assessment> {
        self.results
            .iter()
            .find(|r| r.user_id == user_id && r.tax_year == tax_year)
            .map(|r| &r.result)
    }

    fn flush(&self) -> anyhow::Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("failed to write results file {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        let stored = StoredResults {
            results: self.results.clone(),
        };
        serde_json::to_writer_pretty(&mut writer, &stored)?;
        writer.flush()?;
        Ok(())
    }
}

impl ResultStore for JsonResultStore {
    fn save(
        &mut self,
        user_id: &str,
        tax_year: TaxYear,
        result: &Assessment,
    ) -> anyhow::Result<()> {
        let entry = StoredResult {
            user_id: user_id.to_string(),
            tax_year,
            result: result.clone(),
        };
        match self
            .results
            .iter_mut()
            .find(|r| r.user_id == user_id && r.tax_year == tax_year)
        {
            Some(existing) => {
                log::debug!("Replacing stored result for {} {}", user_id, tax_year);
                *existing = entry;
            }
            None => self.results.push(entry),
        }
        self.results
            .sort_by(|a, b| (&a.user_id, a.tax_year).cmp(&(&b.user_id, b.tax_year)));
        self.flush()
    }
}
