//! SA physical presence test.
//!
//! A person is resident when present for more than 91 days in the current year and in each of
//! the four preceding years, with at least 915 days over the five years. Someone ordinarily
//! resident in SA is resident regardless of presence.

use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::{check_days, EngineError};
use super::rules::PresenceRules;
use super::sa::SaTaxYear;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SaPresenceInput {
    pub tax_year: SaTaxYear,
    pub days_in_sa: u32,
    /// Days in SA for the four preceding years, most recent first
    #[serde(default)]
    pub prior_years_days: Option<[u32; 4]>,
    #[serde(default)]
    pub ordinarily_resident_override: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PresenceTest {
    #[serde(rename = "non_resident")]
    NonResident,
    #[serde(rename = "91_day_current")]
    CurrentYear,
    #[serde(rename = "5_year_average")]
    FiveYearAverage,
    #[serde(rename = "ordinarily_resident")]
    OrdinarilyResident,
}

impl PresenceTest {
    pub fn display(&self) -> &'static str {
        match self {
            PresenceTest::NonResident => "Non-resident",
            PresenceTest::CurrentYear => "91 days (current year only)",
            PresenceTest::FiveYearAverage => "5-year presence",
            PresenceTest::OrdinarilyResident => "Ordinarily resident",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SaPresenceResult {
    pub tax_year: SaTaxYear,
    pub tax_resident: bool,
    pub ordinarily_resident: bool,
    pub test_result: PresenceTest,
    #[schemars(with = "Option<f64>")]
    pub five_year_average: Option<Decimal>,
    /// Decided on the current year alone because prior years were not supplied
    pub provisional: bool,
    pub explanation: String,
}

impl SaPresenceResult {
    fn new(input: &SaPresenceInput, test_result: PresenceTest, explanation: String) -> Self {
        SaPresenceResult {
            tax_year: input.tax_year,
            tax_resident: test_result != PresenceTest::NonResident,
            ordinarily_resident: test_result == PresenceTest::OrdinarilyResident,
            test_result,
            five_year_average: None,
            provisional: false,
            explanation,
        }
    }
}

pub fn evaluate_sa_presence(
    input: &SaPresenceInput,
    rules: &PresenceRules,
) -> Result<SaPresenceResult, EngineError> {
    let days = check_days("days_in_sa", input.days_in_sa)?;
    if let Some(prior) = input.prior_years_days {
        for d in prior {
            check_days("prior_years_days", d)?;
        }
    }

    if input.ordinarily_resident_override {
        log::debug!("SA {}: ordinarily resident override", input.tax_year);
        return Ok(SaPresenceResult::new(
            input,
            PresenceTest::OrdinarilyResident,
            "Ordinarily resident in SA: resident regardless of days present".to_string(),
        ));
    }

    if days <= rules.min_days_exclusive {
        log::debug!("SA {}: {} days fails current year", input.tax_year, days);
        return Ok(SaPresenceResult::new(
            input,
            PresenceTest::NonResident,
            format!(
                "Physical presence test not met: {} days in SA during {}, needs more than {}",
                days, input.tax_year, rules.min_days_exclusive
            ),
        ));
    }

    let Some(prior) = input.prior_years_days else {
        log::debug!("SA {}: no prior years, provisional", input.tax_year);
        let mut result = SaPresenceResult::new(
            input,
            PresenceTest::CurrentYear,
            format!(
                "Provisional: {} days in SA during {} exceeds {}, but the four preceding years were \
                 not supplied so the five-year test could not be applied",
                days, input.tax_year, rules.min_days_exclusive
            ),
        );
        result.provisional = true;
        return Ok(result);
    };

    let mut year = input.tax_year;
    for prior_days in prior {
        year = year.previous();
        if prior_days <= rules.prior_years_min_days_exclusive {
            log::debug!("SA {}: prior year {} fails", input.tax_year, year);
            return Ok(SaPresenceResult::new(
                input,
                PresenceTest::NonResident,
                format!(
                    "Physical presence test not met: {} days in SA during {}, each preceding year \
                     needs more than {}",
                    prior_days, year, rules.prior_years_min_days_exclusive
                ),
            ));
        }
    }

    let total: u32 = days + prior.iter().sum::<u32>();
    if total < rules.five_year_total_days {
        log::debug!("SA {}: five-year total {} fails", input.tax_year, total);
        return Ok(SaPresenceResult::new(
            input,
            PresenceTest::NonResident,
            format!(
                "Physical presence test not met: {} days in SA over five years, needs at least {}",
                total, rules.five_year_total_days
            ),
        ));
    }

    let average = (Decimal::from(total) / Decimal::from(5)).round_dp(rules.average_decimal_places);
    let mut result = SaPresenceResult::new(
        input,
        PresenceTest::FiveYearAverage,
        format!(
            "Physical presence test met: {} days in SA during {} and more than {} in each of the four \
             preceding years, {} days in total (at least {}), average {} per year",
            days,
            input.tax_year,
            rules.prior_years_min_days_exclusive,
            total,
            rules.five_year_total_days,
            average
        ),
    );
    result.five_year_average = Some(average);
    Ok(result)
}
