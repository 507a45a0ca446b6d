pub mod assessment;
pub mod country;
pub mod domicile;
pub mod dta;
pub mod error;
pub mod presence;
pub mod rules;
pub mod sa;
pub mod srt;
pub mod tie_breaker;
pub mod uk;

pub use assessment::{assess, Assessment, AssessmentInput};
pub use country::{Country, Nationality};
pub use domicile::{
    evaluate_deemed_domicile, evaluate_formerly_domiciled_resident, DeemedDomicileResult,
    DomicileTrigger,
};
pub use dta::{
    capital_gains_relief, dividend_relief, employment_relief, interest_relief, pension_relief,
    AssetCategory, CapitalGainInput, DividendInput, DtaReliefResult, EmploymentIncomeInput,
    IncomeType, InterestInput, PensionInput, PensionType, Residence,
};
pub use error::EngineError;
pub use presence::{evaluate_sa_presence, PresenceTest, SaPresenceInput, SaPresenceResult};
pub use rules::RulesConfig;
pub use sa::SaTaxYear;
pub use srt::{evaluate_srt, SrtInput, SrtResult, SrtRule, SrtTest};
pub use tie_breaker::{resolve_tie_breaker, SoleResidence, TieBreakerInput, TieBreakerResult};
pub use uk::TaxYear;
