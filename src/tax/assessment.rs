//! Annual assessment combining both residence tests, the tie-breaker and deemed domicile.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::country::Country;
use super::domicile::{
    evaluate_deemed_domicile, evaluate_formerly_domiciled_resident, DeemedDomicileResult,
};
use super::dta::Residence;
use super::error::EngineError;
use super::presence::{evaluate_sa_presence, SaPresenceInput, SaPresenceResult};
use super::rules::RulesConfig;
use super::srt::{evaluate_srt, SrtInput, SrtResult};
use super::tie_breaker::{resolve_tie_breaker, TieBreakerInput, TieBreakerResult};
use super::uk::TaxYear;
use crate::history::{DomicileStatus, ResidencyRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentInput {
    pub user_id: String,
    /// Date the deemed domicile lookback is measured from
    pub as_of: NaiveDate,
    pub srt: SrtInput,
    pub sa_presence: SaPresenceInput,
    /// Facts for the treaty tie-breaker, used when both countries claim residence
    #[serde(default)]
    pub tie_breaker: Option<TieBreakerInput>,
    #[serde(default)]
    pub uk_domicile_of_origin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Assessment {
    pub user_id: String,
    pub tax_year: TaxYear,
    pub as_of: NaiveDate,
    pub uk: SrtResult,
    pub sa: SaPresenceResult,
    pub dual_resident: bool,
    #[serde(default)]
    pub tie_breaker: Option<TieBreakerResult>,
    pub deemed_domicile: DeemedDomicileResult,
    pub uk_domicile_status: DomicileStatus,
}

impl Assessment {
    pub fn dta_tie_breaker_country(&self) -> Option<Country> {
        self.tie_breaker
            .as_ref()
            .and_then(|t| t.sole_residence.country())
    }

    /// Treaty residence for relief calculations, `None` when resident in neither country
    pub fn residence(&self) -> Option<Residence> {
        match (self.uk.tax_resident, self.sa.tax_resident) {
            (true, true) => Some(
                self.dta_tie_breaker_country()
                    .map_or(Residence::Dual, Residence::from),
            ),
            (true, false) => Some(Residence::Uk),
            (false, true) => Some(Residence::Sa),
            (false, false) => None,
        }
    }

    /// The open-ended history record this assessment implies from `effective_from`
    pub fn to_record(&self, effective_from: NaiveDate) -> ResidencyRecord {
        ResidencyRecord {
            user_id: self.user_id.clone(),
            effective_from,
            effective_to: None,
            uk_tax_resident: self.uk.tax_resident,
            sa_tax_resident: self.sa.tax_resident,
            uk_domicile_status: self.uk_domicile_status,
            dual_resident: self.dual_resident,
            dta_tie_breaker_country: self.dta_tie_breaker_country(),
        }
    }
}

pub fn assess(
    input: &AssessmentInput,
    history: &[ResidencyRecord],
    rules: &RulesConfig,
) -> Result<Assessment, EngineError> {
    // the SA year paired with a UK year is the one running when the UK year starts
    let uk_year = input.srt.tax_year;
    let sa_year = input.sa_presence.tax_year;
    if !sa_year.contains(uk_year.start_date()) {
        return Err(EngineError::MismatchedTaxYears {
            uk: uk_year,
            sa: sa_year,
        });
    }

    let uk = evaluate_srt(&input.srt, &rules.srt)?;
    let sa = evaluate_sa_presence(&input.sa_presence, &rules.presence)?;
    let dual_resident = uk.tax_resident && sa.tax_resident;

    let tie_breaker = if dual_resident {
        input.tie_breaker.as_ref().map(resolve_tie_breaker)
    } else {
        None
    };

    let long_term = evaluate_deemed_domicile(history, input.as_of, &rules.domicile)?;
    let deemed_domicile = if long_term.is_deemed_domiciled || !input.uk_domicile_of_origin {
        long_term
    } else {
        let origin = evaluate_formerly_domiciled_resident(
            history,
            input.as_of,
            input.uk_domicile_of_origin,
            &rules.domicile,
        )?;
        if origin.is_deemed_domiciled {
            origin
        } else {
            long_term
        }
    };

    let previous_status = history
        .iter()
        .filter(|r| r.effective_from <= input.as_of)
        .max_by_key(|r| r.effective_from)
        .map(|r| r.uk_domicile_status);
    let uk_domicile_status = match previous_status {
        Some(DomicileStatus::UkDomicile) => DomicileStatus::UkDomicile,
        _ if deemed_domicile.is_deemed_domiciled => DomicileStatus::DeemedDomicile,
        _ => DomicileStatus::NonUkDomicile,
    };

    log::info!(
        "Assessed {} for {}: UK resident={}, SA resident={}, deemed domiciled={}",
        input.user_id,
        input.srt.tax_year,
        uk.tax_resident,
        sa.tax_resident,
        deemed_domicile.is_deemed_domiciled
    );

    Ok(Assessment {
        user_id: input.user_id.clone(),
        tax_year: input.srt.tax_year,
        as_of: input.as_of,
        uk,
        sa,
        dual_resident,
        tie_breaker,
        deemed_domicile,
        uk_domicile_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::country::Nationality;
    use crate::tax::sa::SaTaxYear;
    use crate::tax::tie_breaker::SoleResidence;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile(days_in_uk: u32, days_in_sa: u32) -> AssessmentInput {
        AssessmentInput {
            user_id: "u1".to_string(),
            as_of: date(2025, 4, 5),
            srt: SrtInput::new(TaxYear(2025), days_in_uk, true),
            sa_presence: SaPresenceInput {
                tax_year: SaTaxYear(2025),
                days_in_sa,
                prior_years_days: Some([200, 200, 200, 200]),
                ordinarily_resident_override: false,
            },
            tie_breaker: Some(TieBreakerInput {
                has_uk_home: false,
                has_sa_home: true,
                uk_vital_interests: false,
                sa_vital_interests: true,
                uk_habitual_abode: false,
                sa_habitual_abode: true,
                nationality: Nationality::Uk,
            }),
            uk_domicile_of_origin: false,
        }
    }

    fn resident_years(from: i32, to: i32, status: DomicileStatus) -> Vec<ResidencyRecord> {
        vec![ResidencyRecord {
            user_id: "u1".to_string(),
            effective_from: TaxYear(from).start_date(),
            effective_to: Some(TaxYear(to).end_date().succ_opt().unwrap()),
            uk_tax_resident: true,
            sa_tax_resident: false,
            uk_domicile_status: status,
            dual_resident: false,
            dta_tie_breaker_country: None,
        }]
    }

    #[test]
    fn dual_resident_runs_tie_breaker() {
        let result = assess(&profile(200, 150), &[], &RulesConfig::default()).unwrap();
        assert!(result.dual_resident);
        let tie_breaker = result.tie_breaker.as_ref().unwrap();
        assert_eq!(tie_breaker.sole_residence, SoleResidence::Sa);
        assert_eq!(result.residence(), Some(Residence::Sa));
        assert_eq!(result.dta_tie_breaker_country(), Some(Country::Sa));
    }

    #[test]
    fn dual_resident_without_tie_breaker_facts_stays_dual() {
        let mut input = profile(200, 150);
        input.tie_breaker = None;
        let result = assess(&input, &[], &RulesConfig::default()).unwrap();
        assert!(result.dual_resident);
        assert_eq!(result.residence(), Some(Residence::Dual));
    }

    #[test]
    fn single_residence_skips_tie_breaker() {
        let result = assess(&profile(10, 150), &[], &RulesConfig::default()).unwrap();
        assert!(!result.dual_resident);
        assert!(result.tie_breaker.is_none());
        assert_eq!(result.residence(), Some(Residence::Sa));

        let result = assess(&profile(10, 20), &[], &RulesConfig::default()).unwrap();
        assert_eq!(result.residence(), None);
    }

    #[test]
    fn long_term_residence_sets_deemed_status() {
        let history = resident_years(2008, 2025, DomicileStatus::NonUkDomicile);
        let result = assess(&profile(200, 0), &history, &RulesConfig::default()).unwrap();
        assert!(result.deemed_domicile.is_deemed_domiciled);
        assert_eq!(result.uk_domicile_status, DomicileStatus::DeemedDomicile);

        let record = result.to_record(date(2025, 4, 6));
        assert_eq!(record.uk_domicile_status, DomicileStatus::DeemedDomicile);
        assert!(record.uk_tax_resident);
        assert_eq!(record.effective_to, None);
    }

    #[test]
    fn uk_domicile_is_kept() {
        let history = resident_years(2020, 2025, DomicileStatus::UkDomicile);
        let result = assess(&profile(200, 0), &history, &RulesConfig::default()).unwrap();
        assert_eq!(result.uk_domicile_status, DomicileStatus::UkDomicile);
    }

    #[test]
    fn domicile_of_origin_trigger_applies_when_flagged() {
        let history = resident_years(2023, 2025, DomicileStatus::NonUkDomicile);
        let mut input = profile(200, 0);
        let result = assess(&input, &history, &RulesConfig::default()).unwrap();
        assert!(!result.deemed_domicile.is_deemed_domiciled);

        input.uk_domicile_of_origin = true;
        let result = assess(&input, &history, &RulesConfig::default()).unwrap();
        assert!(result.deemed_domicile.is_deemed_domiciled);
        assert_eq!(
            result.deemed_domicile.trigger,
            Some(crate::tax::DomicileTrigger::FormerlyDomiciledResident)
        );
    }

    #[test]
    fn invalid_inputs_propagate() {
        let mut input = profile(200, 0);
        input.sa_presence.days_in_sa = 400;
        assert!(assess(&input, &[], &RulesConfig::default()).is_err());
    }

    #[test]
    fn mismatched_sa_year_rejected() {
        let mut input = profile(200, 150);
        input.sa_presence.tax_year = SaTaxYear(2020);
        assert_eq!(
            assess(&input, &[], &RulesConfig::default()),
            Err(EngineError::MismatchedTaxYears {
                uk: TaxYear(2025),
                sa: SaTaxYear(2020),
            })
        );

        // the SA year starting in March 2025 only overlaps the last weeks of 2024/25
        input.sa_presence.tax_year = SaTaxYear(2026);
        assert!(assess(&input, &[], &RulesConfig::default()).is_err());
    }
}
