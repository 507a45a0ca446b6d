//! UK deemed domicile for inheritance tax.
//!
//! Two triggers are supported: long-term residence (15 of the last 20 tax years) and the
//! formerly domiciled resident rule for people with a UK domicile of origin.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::rules::DomicileRules;
use super::uk::TaxYear;
use crate::history::ResidencyRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DomicileTrigger {
    LongTermResidence,
    FormerlyDomiciledResident,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeemedDomicileResult {
    pub is_deemed_domiciled: bool,
    pub deemed_domicile_date: Option<NaiveDate>,
    /// UK resident tax years found in the lookback
    pub uk_resident_years: u32,
    /// The resident years themselves, most recent first
    pub qualifying_years: Vec<TaxYear>,
    pub trigger: Option<DomicileTrigger>,
    pub reason: String,
}

impl DeemedDomicileResult {
    fn not_deemed(uk_resident_years: u32, qualifying_years: Vec<TaxYear>, reason: String) -> Self {
        DeemedDomicileResult {
            is_deemed_domiciled: false,
            deemed_domicile_date: None,
            uk_resident_years,
            qualifying_years,
            trigger: None,
            reason,
        }
    }
}

/// Whether any record marks the person UK resident during `year`, looking no later than `as_of`
fn resident_in(history: &[ResidencyRecord], year: TaxYear, as_of: NaiveDate) -> bool {
    let start = year.start_date();
    let end = year.end_date().min(as_of);
    history
        .iter()
        .any(|r| r.uk_tax_resident && r.overlaps(start, end))
}

/// Tax years from the one containing `as_of` backwards, `count` in total
fn years_back(as_of: NaiveDate, count: u32) -> impl Iterator<Item = TaxYear> {
    let current = TaxYear::from_date(as_of);
    (0..count as i32).map(move |i| TaxYear(current.0 - i))
}

/// Long-term residence trigger: UK resident in at least 15 of the last 20 tax years
pub fn evaluate_deemed_domicile(
    history: &[ResidencyRecord],
    as_of: NaiveDate,
    rules: &DomicileRules,
) -> Result<DeemedDomicileResult, EngineError> {
    rules.validate()?;
    if history.is_empty() {
        return Ok(DeemedDomicileResult::not_deemed(
            0,
            Vec::new(),
            "no records".to_string(),
        ));
    }

    let qualifying_years: Vec<TaxYear> = years_back(as_of, rules.lookback_years)
        .filter(|year| resident_in(history, *year, as_of))
        .collect();
    let uk_resident_years = qualifying_years.len() as u32;
    log::debug!(
        "Deemed domicile as of {}: {} resident years of {}",
        as_of,
        uk_resident_years,
        rules.lookback_years
    );

    if uk_resident_years < rules.qualifying_years {
        let reason = format!(
            "UK resident in {} of the last {} UK tax years, {} needed",
            uk_resident_years, rules.lookback_years, rules.qualifying_years
        );
        return Ok(DeemedDomicileResult::not_deemed(
            uk_resident_years,
            qualifying_years,
            reason,
        ));
    }

    // the year in which the backward count reaches the threshold
    let threshold_year = (rules.qualifying_years as usize)
        .checked_sub(1)
        .and_then(|i| qualifying_years.get(i))
        .copied()
        .ok_or_else(|| EngineError::InvalidRules {
            field: "domicile.qualifying_years",
            reason: "must be at least 1".to_string(),
        })?;
    Ok(DeemedDomicileResult {
        is_deemed_domiciled: true,
        deemed_domicile_date: Some(threshold_year.start_date()),
        uk_resident_years,
        qualifying_years,
        trigger: Some(DomicileTrigger::LongTermResidence),
        reason: format!(
            "UK resident in {} of the last {} UK tax years (at least {}); threshold reached in {}",
            uk_resident_years, rules.lookback_years, rules.qualifying_years, threshold_year
        ),
    })
}

/// Formerly domiciled resident trigger: UK domicile of origin, UK resident in the current tax
/// year and in at least one of the two preceding years
pub fn evaluate_formerly_domiciled_resident(
    history: &[ResidencyRecord],
    as_of: NaiveDate,
    uk_domicile_of_origin: bool,
    rules: &DomicileRules,
) -> Result<DeemedDomicileResult, EngineError> {
    rules.validate()?;
    if !uk_domicile_of_origin {
        return Ok(DeemedDomicileResult::not_deemed(
            0,
            Vec::new(),
            "no UK domicile of origin".to_string(),
        ));
    }
    if history.is_empty() {
        return Ok(DeemedDomicileResult::not_deemed(
            0,
            Vec::new(),
            "no records".to_string(),
        ));
    }

    let current = TaxYear::from_date(as_of);
    let qualifying_years: Vec<TaxYear> = years_back(as_of, rules.origin_recent_years + 1)
        .filter(|year| resident_in(history, *year, as_of))
        .collect();
    let uk_resident_years = qualifying_years.len() as u32;
    let resident_now = qualifying_years.first() == Some(&current);
    let resident_recently = qualifying_years.iter().any(|year| *year != current);

    if !resident_now || !resident_recently {
        let reason = if resident_now {
            format!(
                "UK domicile of origin and UK resident in {}, but not in either of the {} \
                 preceding tax years",
                current, rules.origin_recent_years
            )
        } else {
            format!("UK domicile of origin but not UK resident in {}", current)
        };
        return Ok(DeemedDomicileResult::not_deemed(
            uk_resident_years,
            qualifying_years,
            reason,
        ));
    }

    Ok(DeemedDomicileResult {
        is_deemed_domiciled: true,
        deemed_domicile_date: Some(current.start_date()),
        uk_resident_years,
        qualifying_years,
        trigger: Some(DomicileTrigger::FormerlyDomiciledResident),
        reason: format!(
            "UK domicile of origin and UK resident in {} and at least one of the {} preceding \
             tax years",
            current, rules.origin_recent_years
        ),
    })
}
