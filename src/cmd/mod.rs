pub mod assess;
pub mod domicile;
pub mod presence;
pub mod relief;
pub mod rules;
pub mod schema;
pub mod srt;
pub mod tie_breaker;

use anyhow::Context;
use clap::Args;
use residency::tax::RulesConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

/// Rule overrides shared by every evaluating command
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// JSON file overriding the default rule thresholds
    #[arg(long)]
    rules: Option<PathBuf>,
}

impl RulesArgs {
    pub fn load(&self) -> anyhow::Result<RulesConfig> {
        RulesConfig::load_or_default(self.rules.as_deref())
    }
}

/// Read a JSON input (or stdin with "-")
pub fn read_json_input<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        io::stdin().lock().read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
        }
        return Ok(serde_json::from_slice(&buffer)?);
    }

    let file =
        File::open(path).with_context(|| format!("failed to open input {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid input {}", path.display()))
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
