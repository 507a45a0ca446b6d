use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::EngineError;

/// UK Tax Year (runs 6 April to 5 April)
/// The year value represents the end year (e.g., 2025 = 2024/25 tax year)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Create a tax year from a date
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        // If date is 6 April or later, it's in the tax year ending next April
        if (date.month(), date.day()) >= (4, 6) {
            TaxYear(year + 1)
        } else {
            TaxYear(year)
        }
    }

    /// Start date of the tax year (6 April of previous year)
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 - 1, 4, 6).expect("6 April is always a valid date")
    }

    /// End date of the tax year (5 April)
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 4, 5).expect("5 April is always a valid date")
    }

    pub fn previous(&self) -> TaxYear {
        TaxYear(self.0 - 1)
    }

    /// Display as "2024/25" format
    pub fn display(&self) -> String {
        format!("{}/{:02}", self.0 - 1, self.0.rem_euclid(100))
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Accepts either the end year ("2025") or the span form ("2024/25")
impl FromStr for TaxYear {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || EngineError::InvalidTaxYear(s.to_string());
        match s.split_once('/') {
            Some((start, end)) => {
                let start: i32 = start.parse().map_err(|_| invalid())?;
                let end: i32 = end.parse().map_err(|_| invalid())?;
                if (start + 1).rem_euclid(100) != end {
                    return Err(invalid());
                }
                Ok(TaxYear(start + 1))
            }
            None => s.parse().map(TaxYear).map_err(|_| invalid()),
        }
    }
}
