use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::EngineError;

/// SA Tax Year (runs 1 March to the last day of February)
/// The year value represents the end year (e.g., 2025 = 1 March 2024 to 28 February 2025)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct SaTaxYear(pub i32);

impl SaTaxYear {
    pub fn from_date(date: NaiveDate) -> Self {
        if date.month() >= 3 {
            SaTaxYear(date.year() + 1)
        } else {
            SaTaxYear(date.year())
        }
    }

    /// 1 March of the previous calendar year
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 - 1, 3, 1).expect("1 March is always a valid date")
    }

    /// Last day of February, 29th in leap years
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 3, 1)
            .and_then(|d| d.pred_opt())
            .expect("28/29 February is always a valid date")
    }

    pub fn previous(&self) -> SaTaxYear {
        SaTaxYear(self.0 - 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    pub fn display(&self) -> String {
        format!("{}/{:02}", self.0 - 1, self.0.rem_euclid(100))
    }
}

impl std::fmt::Display for SaTaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SA {}", self.display())
    }
}

impl FromStr for SaTaxYear {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<i32>()
            .map(SaTaxYear)
            .map_err(|_| EngineError::InvalidTaxYear(s.to_string()))
    }
}
