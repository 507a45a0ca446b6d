//! Residency history: the long-lived records the evaluators read.
//!
//! Records are owned by the caller. The engine only reads them; `validate_history` lets an
//! adapter reject files that break the per-user period invariants before evaluation.

use anyhow::Context;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use crate::tax::{Country, EngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomicileStatus {
    UkDomicile,
    NonUkDomicile,
    DeemedDomicile,
}

impl DomicileStatus {
    pub fn display(&self) -> &'static str {
        match self {
            DomicileStatus::UkDomicile => "UK domicile",
            DomicileStatus::NonUkDomicile => "Non-UK domicile",
            DomicileStatus::DeemedDomicile => "Deemed UK domicile",
        }
    }
}

impl FromStr for DomicileStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "UK_DOMICILE" => Ok(DomicileStatus::UkDomicile),
            "NON_UK_DOMICILE" => Ok(DomicileStatus::NonUkDomicile),
            "DEEMED_DOMICILE" => Ok(DomicileStatus::DeemedDomicile),
            _ => Err(EngineError::UnknownDomicileStatus(s.to_string())),
        }
    }
}

/// A period during which a person's residency position was fixed.
/// Covers `[effective_from, effective_to)`; an open record has no end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResidencyRecord {
    pub user_id: String,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    pub uk_tax_resident: bool,
    pub sa_tax_resident: bool,
    pub uk_domicile_status: DomicileStatus,
    #[serde(default)]
    pub dual_resident: bool,
    #[serde(default)]
    pub dta_tie_breaker_country: Option<Country>,
}

impl ResidencyRecord {
    /// Whether the record covers any day of the inclusive range `[start, end]`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.effective_from <= end && self.effective_to.map_or(true, |to| to > start)
    }
}

/// Input root for history JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryInput {
    pub records: Vec<ResidencyRecord>,
}

/// CSV row for a residency record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidencyRecordRow {
    pub user_id: String,
    pub effective_from: String,
    #[serde(default)]
    pub effective_to: Option<String>,
    pub uk_tax_resident: bool,
    pub sa_tax_resident: bool,
    pub uk_domicile_status: String,
    #[serde(default)]
    pub dual_resident: bool,
    #[serde(default)]
    pub dta_tie_breaker_country: Option<String>,
}

pub const CSV_FIELD_DESCRIPTIONS: &[(&str, bool, &str)] = &[
    ("user_id", true, "Identifier of the person the record belongs to"),
    ("effective_from", true, "First day of the period (YYYY-MM-DD)"),
    (
        "effective_to",
        false,
        "Day after the last day of the period (YYYY-MM-DD), empty if current",
    ),
    ("uk_tax_resident", true, "true or false"),
    ("sa_tax_resident", true, "true or false"),
    (
        "uk_domicile_status",
        true,
        "UK_DOMICILE, NON_UK_DOMICILE or DEEMED_DOMICILE",
    ),
    ("dual_resident", false, "true or false"),
    (
        "dta_tie_breaker_country",
        false,
        "UK or SA when a treaty tie-breaker has been decided",
    ),
];

fn parse_date(s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidDate(s.to_string()))
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TryFrom<ResidencyRecordRow> for ResidencyRecord {
    type Error = EngineError;

    fn try_from(row: ResidencyRecordRow) -> Result<Self, Self::Error> {
        Ok(ResidencyRecord {
            effective_from: parse_date(&row.effective_from)?,
            effective_to: non_empty(&row.effective_to).map(parse_date).transpose()?,
            uk_tax_resident: row.uk_tax_resident,
            sa_tax_resident: row.sa_tax_resident,
            uk_domicile_status: row.uk_domicile_status.parse()?,
            dual_resident: row.dual_resident,
            dta_tie_breaker_country: non_empty(&row.dta_tie_breaker_country)
                .map(str::parse)
                .transpose()?,
            user_id: row.user_id,
        })
    }
}

pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Vec<ResidencyRecord>> {
    let input: HistoryInput = serde_json::from_reader(reader)?;
    Ok(input.records)
}

pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<Vec<ResidencyRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for (i, result) in rdr.deserialize::<ResidencyRecordRow>().enumerate() {
        let row = result.with_context(|| format!("invalid history row {}", i + 1))?;
        let record =
            ResidencyRecord::try_from(row).with_context(|| format!("invalid history row {}", i + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Check the per-user invariants: periods are non-empty, never overlap, and at most one is open
pub fn validate_history(records: &[ResidencyRecord]) -> Result<(), EngineError> {
    let mut by_user: BTreeMap<&str, Vec<&ResidencyRecord>> = BTreeMap::new();
    for record in records {
        if let Some(to) = record.effective_to {
            if to <= record.effective_from {
                return Err(EngineError::InvalidPeriod {
                    user_id: record.user_id.clone(),
                    effective_from: record.effective_from,
                    effective_to: to,
                });
            }
        }
        by_user.entry(&record.user_id).or_default().push(record);
    }

    for (user_id, mut periods) in by_user {
        let open = periods.iter().filter(|r| r.effective_to.is_none()).count();
        if open > 1 {
            return Err(EngineError::MultipleOpenPeriods {
                user_id: user_id.to_string(),
                count: open,
            });
        }

        periods.sort_by_key(|r| r.effective_from);
        for pair in periods.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let clear = first
                .effective_to
                .is_some_and(|to| to <= second.effective_from);
            if !clear {
                return Err(EngineError::OverlappingPeriods {
                    user_id: user_id.to_string(),
                    first: first.effective_from,
                    second: second.effective_from,
                });
            }
        }
    }
    Ok(())
}

/// Source of a user's residency history
pub trait ResidencyHistory {
    /// Records for `user_id` starting on or before `as_of`, ordered by `effective_from`
    fn list_residency_records(
        &self,
        user_id: &str,
        as_of: NaiveDate,
    ) -> anyhow::Result<Vec<ResidencyRecord>>;
}

/// History loaded from a JSON (`{"records": [...]}`) or CSV file
#[derive(Debug, Clone)]
pub struct FileHistory {
    records: Vec<ResidencyRecord>,
}

impl FileHistory {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open history file {}", path.display()))?;
        let reader = BufReader::new(file);
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let records = if is_csv {
            read_csv(reader)?
        } else {
            read_json(reader)?
        };
        Self::from_records(path, records)
    }

    pub fn from_records(path: &Path, records: Vec<ResidencyRecord>) -> anyhow::Result<Self> {
        validate_history(&records)
            .with_context(|| format!("history file {} is inconsistent", path.display()))?;
        log::info!("Loaded {} residency records from {}", records.len(), path.display());
        Ok(FileHistory { records })
    }
}

impl ResidencyHistory for FileHistory {
    fn list_residency_records(
        &self,
        user_id: &str,
        as_of: NaiveDate,
    ) -> anyhow::Result<Vec<ResidencyRecord>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.effective_from <= as_of)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.effective_from);
        Ok(records)
    }
}
