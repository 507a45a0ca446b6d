use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::dta::AssetCategory;
use super::sa::SaTaxYear;
use super::uk::TaxYear;

/// Input validation failures. Values are never clamped; a rejected input is reported as-is.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{field} must be between 0 and 366 days, got {value}")]
    InvalidDayCount { field: &'static str, value: u32 },
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("{field} must be a rate between 0 and 1, got {value}")]
    InvalidRate { field: &'static str, value: Decimal },
    #[error("unrecognised country code: {0}")]
    UnknownCountry(String),
    #[error("unrecognised nationality: {0}")]
    UnknownNationality(String),
    #[error("unrecognised asset category: {0}")]
    UnknownAssetCategory(String),
    #[error("{0:?} requires the country where the asset is located")]
    MissingAssetLocation(AssetCategory),
    #[error("unrecognised pension type: {0}")]
    UnknownPensionType(String),
    #[error("unrecognised domicile status: {0}")]
    UnknownDomicileStatus(String),
    #[error("invalid tax year: {0}")]
    InvalidTaxYear(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("record for {user_id} ends on {effective_to} which is not after {effective_from}")]
    InvalidPeriod {
        user_id: String,
        effective_from: NaiveDate,
        effective_to: NaiveDate,
    },
    #[error("records for {user_id} overlap: period from {first} and period from {second}")]
    OverlappingPeriods {
        user_id: String,
        first: NaiveDate,
        second: NaiveDate,
    },
    #[error("{user_id} has {count} open-ended records, at most one is allowed")]
    MultipleOpenPeriods { user_id: String, count: usize },
    #[error("invalid rules: {field} {reason}")]
    InvalidRules { field: &'static str, reason: String },
    #[error("presence year {sa} does not match UK tax year {uk}")]
    MismatchedTaxYears { uk: TaxYear, sa: SaTaxYear },
}

/// Rejects day counts outside a tax year's possible range
pub(crate) fn check_days(field: &'static str, value: u32) -> Result<u32, EngineError> {
    if value > 366 {
        return Err(EngineError::InvalidDayCount { field, value });
    }
    Ok(value)
}

pub(crate) fn check_amount(field: &'static str, value: Decimal) -> Result<Decimal, EngineError> {
    if value < Decimal::ZERO {
        return Err(EngineError::NegativeAmount { field, value });
    }
    Ok(value)
}

pub(crate) fn check_rate(field: &'static str, value: Decimal) -> Result<Decimal, EngineError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(EngineError::InvalidRate { field, value });
    }
    Ok(value)
}
