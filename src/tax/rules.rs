//! Statutory thresholds used by the evaluators.
//!
//! Defaults reflect the rules in force for 2024/25. Any field may be overridden from a JSON
//! file; fields missing from the file keep their default.

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::error::{check_rate, EngineError};

/// Longest domicile lookback accepted from a rules file
pub const MAX_LOOKBACK_YEARS: u32 = 100;

/// Ties that exist in the sufficient ties test
const TIE_COUNT: u32 = 5;

/// Decimal supports at most this many fractional digits
const MAX_DECIMAL_PLACES: u32 = 28;

fn invalid(field: &'static str, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidRules {
        field,
        reason: reason.into(),
    }
}

fn check_day_threshold(field: &'static str, days: u32) -> Result<(), EngineError> {
    if days > 366 {
        return Err(invalid(field, format!("must be at most 366 days, got {}", days)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RulesConfig {
    pub srt: SrtRules,
    pub presence: PresenceRules,
    pub domicile: DomicileRules,
    pub dta: DtaRules,
}

impl RulesConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open rules file {}", path.display()))?;
        Self::read_json(BufReader::new(file))
    }

    pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Self> {
        let rules: RulesConfig = serde_json::from_reader(reader)?;
        rules.validate()?;
        log::debug!("Loaded rules: {:?}", rules);
        Ok(rules)
    }

    /// Reject thresholds no evaluator can apply
    pub fn validate(&self) -> Result<(), EngineError> {
        self.srt.validate()?;
        self.presence.validate()?;
        self.domicile.validate()?;
        self.dta.validate()
    }

    /// Rules from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Half-open day band `[from, to)` and the number of ties needed within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TieBand {
    pub from: u32,
    pub to: u32,
    pub ties_required: u32,
}

impl TieBand {
    const fn new(from: u32, to: u32, ties_required: u32) -> Self {
        TieBand {
            from,
            to,
            ties_required,
        }
    }

    pub fn contains(&self, days: u32) -> bool {
        days >= self.from && days < self.to
    }
}

impl std::fmt::Display for TieBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SrtRules {
    /// Leavers present for fewer days than this are automatically non-resident
    pub leaver_overseas_days: u32,
    /// Arrivers present for fewer days than this are automatically non-resident
    pub arriver_overseas_days: u32,
    /// Full-time workers abroad present for fewer days than this are automatically non-resident
    pub work_abroad_days: u32,
    /// Most UK working days allowed while working full-time abroad
    pub work_abroad_max_uk_work_days: u32,
    /// Days of presence that make someone automatically resident
    pub automatic_uk_days: u32,
    /// Days a sole UK home must be used for the home test
    pub uk_home_days: u32,
    /// Days of use for available accommodation to count as a tie
    pub accommodation_tie_days: u32,
    /// UK working days for the work tie
    pub work_tie_days: u32,
    /// UK days in either prior year for the 90-day tie
    pub ninety_day_tie_days: u32,
    pub leaver_bands: Vec<TieBand>,
    pub arriver_bands: Vec<TieBand>,
}

impl Default for SrtRules {
    fn default() -> Self {
        SrtRules {
            leaver_overseas_days: 16,
            arriver_overseas_days: 46,
            work_abroad_days: 91,
            work_abroad_max_uk_work_days: 30,
            automatic_uk_days: 183,
            uk_home_days: 30,
            accommodation_tie_days: 1,
            work_tie_days: 40,
            ninety_day_tie_days: 90,
            leaver_bands: vec![
                TieBand::new(16, 46, 4),
                TieBand::new(46, 91, 3),
                TieBand::new(91, 121, 2),
                TieBand::new(121, 183, 1),
            ],
            arriver_bands: vec![
                TieBand::new(46, 91, 4),
                TieBand::new(91, 121, 3),
                TieBand::new(121, 183, 2),
            ],
        }
    }
}

impl SrtRules {
    /// The band covering `days` for a leaver or an arriver
    pub fn band_for(&self, leaver: bool, days: u32) -> Option<TieBand> {
        let bands = if leaver {
            &self.leaver_bands
        } else {
            &self.arriver_bands
        };
        bands.iter().copied().find(|band| band.contains(days))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, days) in [
            ("srt.leaver_overseas_days", self.leaver_overseas_days),
            ("srt.arriver_overseas_days", self.arriver_overseas_days),
            ("srt.work_abroad_days", self.work_abroad_days),
            ("srt.work_abroad_max_uk_work_days", self.work_abroad_max_uk_work_days),
            ("srt.automatic_uk_days", self.automatic_uk_days),
            ("srt.uk_home_days", self.uk_home_days),
            ("srt.accommodation_tie_days", self.accommodation_tie_days),
            ("srt.work_tie_days", self.work_tie_days),
            ("srt.ninety_day_tie_days", self.ninety_day_tie_days),
        ] {
            check_day_threshold(field, days)?;
        }
        check_bands("srt.leaver_bands", &self.leaver_bands)?;
        check_bands("srt.arriver_bands", &self.arriver_bands)
    }
}

/// Bands must be non-empty, need between one and five ties, and must not overlap
fn check_bands(field: &'static str, bands: &[TieBand]) -> Result<(), EngineError> {
    for band in bands {
        if band.from >= band.to {
            return Err(invalid(field, format!("band {} is empty", band)));
        }
        if band.to > 367 {
            return Err(invalid(field, format!("band {} goes past 366 days", band)));
        }
        if band.ties_required == 0 || band.ties_required > TIE_COUNT {
            return Err(invalid(
                field,
                format!(
                    "band {} requires {} ties, must be between 1 and {}",
                    band, band.ties_required, TIE_COUNT
                ),
            ));
        }
    }
    let mut sorted = bands.to_vec();
    sorted.sort_by_key(|band| band.from);
    for pair in sorted.windows(2) {
        if pair[0].to > pair[1].from {
            return Err(invalid(
                field,
                format!("bands {} and {} overlap", pair[0], pair[1]),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PresenceRules {
    /// Current-year days must exceed this
    pub min_days_exclusive: u32,
    /// Each prior year's days must exceed this
    pub prior_years_min_days_exclusive: u32,
    /// Current plus the four prior years must reach this
    pub five_year_total_days: u32,
    /// Precision of the reported five-year average
    pub average_decimal_places: u32,
}

impl PresenceRules {
    pub fn validate(&self) -> Result<(), EngineError> {
        check_day_threshold("presence.min_days_exclusive", self.min_days_exclusive)?;
        check_day_threshold(
            "presence.prior_years_min_days_exclusive",
            self.prior_years_min_days_exclusive,
        )?;
        if self.five_year_total_days > 5 * 366 {
            return Err(invalid(
                "presence.five_year_total_days",
                format!("must be at most {}, got {}", 5 * 366, self.five_year_total_days),
            ));
        }
        if self.average_decimal_places > MAX_DECIMAL_PLACES {
            return Err(invalid(
                "presence.average_decimal_places",
                format!("must be at most {}", MAX_DECIMAL_PLACES),
            ));
        }
        Ok(())
    }
}

impl Default for PresenceRules {
    fn default() -> Self {
        PresenceRules {
            min_days_exclusive: 91,
            prior_years_min_days_exclusive: 91,
            five_year_total_days: 915,
            average_decimal_places: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DomicileRules {
    /// Resident years needed within the lookback
    pub qualifying_years: u32,
    /// Tax years examined, counting the current one
    pub lookback_years: u32,
    /// Preceding years checked by the domicile-of-origin trigger
    pub origin_recent_years: u32,
}

impl DomicileRules {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lookback_years == 0 || self.lookback_years > MAX_LOOKBACK_YEARS {
            return Err(invalid(
                "domicile.lookback_years",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_LOOKBACK_YEARS, self.lookback_years
                ),
            ));
        }
        if self.qualifying_years == 0 || self.qualifying_years > self.lookback_years {
            return Err(invalid(
                "domicile.qualifying_years",
                format!(
                    "must be between 1 and lookback_years ({}), got {}",
                    self.lookback_years, self.qualifying_years
                ),
            ));
        }
        if self.origin_recent_years == 0 || self.origin_recent_years >= MAX_LOOKBACK_YEARS {
            return Err(invalid(
                "domicile.origin_recent_years",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_LOOKBACK_YEARS - 1,
                    self.origin_recent_years
                ),
            ));
        }
        Ok(())
    }
}

impl Default for DomicileRules {
    fn default() -> Self {
        DomicileRules {
            qualifying_years: 15,
            lookback_years: 20,
            origin_recent_years: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DtaRules {
    /// Treaty cap on dividend withholding in the source country
    #[schemars(with = "f64")]
    pub dividend_withholding_rate: Decimal,
    #[schemars(with = "f64")]
    pub interest_withholding_rate: Decimal,
    pub money_decimal_places: u32,
}

impl DtaRules {
    pub fn validate(&self) -> Result<(), EngineError> {
        check_rate("dta.dividend_withholding_rate", self.dividend_withholding_rate)?;
        check_rate("dta.interest_withholding_rate", self.interest_withholding_rate)?;
        if self.money_decimal_places > MAX_DECIMAL_PLACES {
            return Err(invalid(
                "dta.money_decimal_places",
                format!("must be at most {}", MAX_DECIMAL_PLACES),
            ));
        }
        Ok(())
    }
}

impl Default for DtaRules {
    fn default() -> Self {
        DtaRules {
            dividend_withholding_rate: dec!(0.15),
            interest_withholding_rate: Decimal::ZERO,
            money_decimal_places: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaver_bands_are_half_open() {
        let rules = SrtRules::default();
        assert_eq!(rules.band_for(true, 15), None);
        assert_eq!(rules.band_for(true, 16).unwrap().ties_required, 4);
        assert_eq!(rules.band_for(true, 45).unwrap().ties_required, 4);
        assert_eq!(rules.band_for(true, 46).unwrap().ties_required, 3);
        assert_eq!(rules.band_for(true, 120).unwrap().ties_required, 2);
        assert_eq!(rules.band_for(true, 182).unwrap().ties_required, 1);
        assert_eq!(rules.band_for(true, 183), None);
    }

    #[test]
    fn arriver_bands_start_at_46() {
        let rules = SrtRules::default();
        assert_eq!(rules.band_for(false, 45), None);
        assert_eq!(rules.band_for(false, 46).unwrap().ties_required, 4);
        assert_eq!(rules.band_for(false, 91).unwrap().ties_required, 3);
        assert_eq!(rules.band_for(false, 121).unwrap().ties_required, 2);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "dta": { "dividend_withholding_rate": "0.10" } }"#;
        let rules = RulesConfig::read_json(json.as_bytes()).unwrap();
        assert_eq!(rules.dta.dividend_withholding_rate, dec!(0.10));
        assert_eq!(rules.dta.interest_withholding_rate, Decimal::ZERO);
        assert_eq!(rules.srt, SrtRules::default());
        assert_eq!(rules.domicile.qualifying_years, 15);
    }

    #[test]
    fn defaults_round_trip_through_json() {
        let json = serde_json::to_string(&RulesConfig::default()).unwrap();
        let rules = RulesConfig::read_json(json.as_bytes()).unwrap();
        assert_eq!(rules, RulesConfig::default());
    }

    fn rejected(json: &str) -> String {
        let err = RulesConfig::read_json(json.as_bytes()).unwrap_err();
        format!("{err:#}")
    }

    #[test]
    fn defaults_are_valid() {
        assert_eq!(RulesConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_qualifying_years_rejected() {
        let err = rejected(r#"{ "domicile": { "qualifying_years": 0 } }"#);
        assert!(err.contains("domicile.qualifying_years"), "{err}");
    }

    #[test]
    fn qualifying_years_beyond_lookback_rejected() {
        let err = rejected(r#"{ "domicile": { "qualifying_years": 21 } }"#);
        assert!(err.contains("domicile.qualifying_years"), "{err}");
    }

    #[test]
    fn huge_lookback_rejected() {
        let err = rejected(r#"{ "domicile": { "lookback_years": 1000000 } }"#);
        assert!(err.contains("domicile.lookback_years"), "{err}");
        let err = rejected(r#"{ "domicile": { "lookback_years": 4294967295 } }"#);
        assert!(err.contains("domicile.lookback_years"), "{err}");
        let err = rejected(r#"{ "domicile": { "lookback_years": 0 } }"#);
        assert!(err.contains("domicile.lookback_years"), "{err}");
    }

    #[test]
    fn zero_origin_years_rejected() {
        let err = rejected(r#"{ "domicile": { "origin_recent_years": 0 } }"#);
        assert!(err.contains("domicile.origin_recent_years"), "{err}");
    }

    #[test]
    fn empty_band_rejected() {
        let err = rejected(
            r#"{ "srt": { "leaver_bands": [ { "from": 46, "to": 46, "ties_required": 3 } ] } }"#,
        );
        assert!(err.contains("srt.leaver_bands"), "{err}");
        assert!(err.contains("[46, 46) is empty"), "{err}");
    }

    #[test]
    fn overlapping_bands_rejected() {
        let err = rejected(
            r#"{ "srt": { "arriver_bands": [
                { "from": 91, "to": 150, "ties_required": 3 },
                { "from": 46, "to": 100, "ties_required": 4 }
            ] } }"#,
        );
        assert!(err.contains("srt.arriver_bands"), "{err}");
        assert!(err.contains("overlap"), "{err}");
    }

    #[test]
    fn band_tie_count_must_be_reachable() {
        let err = rejected(
            r#"{ "srt": { "leaver_bands": [ { "from": 16, "to": 46, "ties_required": 6 } ] } }"#,
        );
        assert!(err.contains("requires 6 ties"), "{err}");
        let err = rejected(
            r#"{ "srt": { "leaver_bands": [ { "from": 16, "to": 46, "ties_required": 0 } ] } }"#,
        );
        assert!(err.contains("requires 0 ties"), "{err}");
    }

    #[test]
    fn day_thresholds_bounded() {
        let err = rejected(r#"{ "srt": { "automatic_uk_days": 400 } }"#);
        assert!(err.contains("srt.automatic_uk_days"), "{err}");
        let err = rejected(r#"{ "presence": { "five_year_total_days": 2000 } }"#);
        assert!(err.contains("presence.five_year_total_days"), "{err}");
    }

    #[test]
    fn withholding_rate_must_be_fraction() {
        let err = rejected(r#"{ "dta": { "dividend_withholding_rate": "15" } }"#);
        assert!(err.contains("dta.dividend_withholding_rate"), "{err}");
    }
}
