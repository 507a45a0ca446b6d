//! Treaty tie-breaker for people resident in both countries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::country::{Country, Nationality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TieBreakerInput {
    #[serde(default)]
    pub has_uk_home: bool,
    #[serde(default)]
    pub has_sa_home: bool,
    #[serde(default)]
    pub uk_vital_interests: bool,
    #[serde(default)]
    pub sa_vital_interests: bool,
    #[serde(default)]
    pub uk_habitual_abode: bool,
    #[serde(default)]
    pub sa_habitual_abode: bool,
    pub nationality: Nationality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SoleResidence {
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "SA")]
    Sa,
    #[serde(rename = "UNDETERMINED")]
    Undetermined,
}

impl SoleResidence {
    pub fn country(self) -> Option<Country> {
        match self {
            SoleResidence::Uk => Some(Country::Uk),
            SoleResidence::Sa => Some(Country::Sa),
            SoleResidence::Undetermined => None,
        }
    }
}

impl From<Country> for SoleResidence {
    fn from(country: Country) -> Self {
        match country {
            Country::Uk => SoleResidence::Uk,
            Country::Sa => SoleResidence::Sa,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TieBreakerResult {
    pub sole_residence: SoleResidence,
    pub test_applied: String,
    pub explanation: String,
}

/// Steps of the cascade, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    PermanentHome,
    VitalInterests,
    HabitualAbode,
    Nationality,
}

const STEPS: [Step; 4] = [
    Step::PermanentHome,
    Step::VitalInterests,
    Step::HabitualAbode,
    Step::Nationality,
];

pub const MUTUAL_AGREEMENT: &str = "Mutual agreement procedure";

impl Step {
    fn name(self) -> &'static str {
        match self {
            Step::PermanentHome => "Permanent home",
            Step::VitalInterests => "Centre of vital interests",
            Step::HabitualAbode => "Habitual abode",
            Step::Nationality => "Nationality",
        }
    }

    /// Whether the step is reached at all. Vital interests only decide between two homes.
    fn applies(self, input: &TieBreakerInput) -> bool {
        match self {
            Step::VitalInterests => input.has_uk_home && input.has_sa_home,
            _ => true,
        }
    }

    /// The country this step points to, if it is decisive
    fn decide(self, input: &TieBreakerInput) -> Option<Country> {
        match self {
            Step::PermanentHome => exactly_one(input.has_uk_home, input.has_sa_home),
            Step::VitalInterests => exactly_one(input.uk_vital_interests, input.sa_vital_interests),
            Step::HabitualAbode => exactly_one(input.uk_habitual_abode, input.sa_habitual_abode),
            Step::Nationality => input.nationality.sole_country(),
        }
    }

    fn reason(self, country: Country) -> String {
        match self {
            Step::PermanentHome => format!("permanent home available only in {}", country),
            Step::VitalInterests => format!(
                "homes in both countries, personal and economic relations closer to {}",
                country
            ),
            Step::HabitualAbode => format!("habitual abode only in {}", country),
            Step::Nationality => format!("national of {} only", country),
        }
    }
}

fn exactly_one(uk: bool, sa: bool) -> Option<Country> {
    match (uk, sa) {
        (true, false) => Some(Country::Uk),
        (false, true) => Some(Country::Sa),
        _ => None,
    }
}

/// Resolve a dual residence to a single treaty residence. The first decisive step wins; if
/// none is decisive the case goes to mutual agreement and the result is `Undetermined`.
pub fn resolve_tie_breaker(input: &TieBreakerInput) -> TieBreakerResult {
    let mut skipped = Vec::new();
    for step in STEPS {
        if !step.applies(input) {
            continue;
        }
        if let Some(country) = step.decide(input) {
            log::debug!("Tie-breaker decided by {:?}: {}", step, country);
            return TieBreakerResult {
                sole_residence: country.into(),
                test_applied: step.name().to_string(),
                explanation: format!(
                    "Treaty resident in {}: {}",
                    country,
                    step.reason(country)
                ),
            };
        }
        skipped.push(step.name());
    }

    log::debug!("Tie-breaker undetermined after {:?}", skipped);
    TieBreakerResult {
        sole_residence: SoleResidence::Undetermined,
        test_applied: MUTUAL_AGREEMENT.to_string(),
        explanation: format!(
            "No test was decisive ({}); residence must be settled by the competent authorities \
             under the mutual agreement procedure",
            skipped.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(nationality: Nationality) -> TieBreakerInput {
        TieBreakerInput {
            has_uk_home: false,
            has_sa_home: false,
            uk_vital_interests: false,
            sa_vital_interests: false,
            uk_habitual_abode: false,
            sa_habitual_abode: false,
            nationality,
        }
    }

    #[test]
    fn uk_home_only_decides_irrespective_of_other_flags() {
        for nationality in [Nationality::Uk, Nationality::Sa, Nationality::Both] {
            let mut i = input(nationality);
            i.has_uk_home = true;
            i.sa_vital_interests = true;
            i.sa_habitual_abode = true;
            let result = resolve_tie_breaker(&i);
            assert_eq!(result.sole_residence, SoleResidence::Uk);
            assert_eq!(result.test_applied, "Permanent home");
        }
    }

    #[test]
    fn vital_interests_decide_between_two_homes() {
        let mut i = input(Nationality::Uk);
        i.has_uk_home = true;
        i.has_sa_home = true;
        i.sa_vital_interests = true;
        let result = resolve_tie_breaker(&i);
        assert_eq!(result.sole_residence, SoleResidence::Sa);
        assert_eq!(result.test_applied, "Centre of vital interests");
    }

    #[test]
    fn vital_interests_skipped_without_homes() {
        let mut i = input(Nationality::Both);
        i.uk_vital_interests = true;
        i.sa_habitual_abode = true;
        let result = resolve_tie_breaker(&i);
        assert_eq!(result.sole_residence, SoleResidence::Sa);
        assert_eq!(result.test_applied, "Habitual abode");
    }

    #[test]
    fn habitual_abode_when_vital_interests_indeterminate() {
        let mut i = input(Nationality::Sa);
        i.has_uk_home = true;
        i.has_sa_home = true;
        i.uk_vital_interests = true;
        i.sa_vital_interests = true;
        i.uk_habitual_abode = true;
        let result = resolve_tie_breaker(&i);
        assert_eq!(result.sole_residence, SoleResidence::Uk);
        assert_eq!(result.test_applied, "Habitual abode");
    }

    #[test]
    fn nationality_when_abode_indeterminate() {
        let mut i = input(Nationality::Sa);
        i.uk_habitual_abode = true;
        i.sa_habitual_abode = true;
        let result = resolve_tie_breaker(&i);
        assert_eq!(result.sole_residence, SoleResidence::Sa);
        assert_eq!(result.test_applied, "Nationality");
    }

    #[test]
    fn undetermined_goes_to_mutual_agreement() {
        let mut i = input(Nationality::Both);
        i.has_uk_home = true;
        i.has_sa_home = true;
        let result = resolve_tie_breaker(&i);
        assert_eq!(result.sole_residence, SoleResidence::Undetermined);
        assert_eq!(result.test_applied, MUTUAL_AGREEMENT);
        assert!(result.explanation.contains("mutual agreement procedure"));
        assert!(result.explanation.contains("Centre of vital interests"));
    }

    #[test]
    fn serde_uses_upper_case_codes() {
        assert_eq!(
            serde_json::to_string(&SoleResidence::Undetermined).unwrap(),
            "\"UNDETERMINED\""
        );
        let parsed: TieBreakerInput =
            serde_json::from_str(r#"{"has_sa_home": true, "nationality": "BOTH"}"#).unwrap();
        assert_eq!(resolve_tie_breaker(&parsed).sole_residence, SoleResidence::Sa);
    }
}
