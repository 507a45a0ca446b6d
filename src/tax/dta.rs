//! Double taxation relief under the UK/SA treaty.
//!
//! Each income category has its own allocation of taxing rights. Callers supply the effective
//! rate each country would charge on the income; the calculator decides who may tax it and how
//! much credit the residence country gives.

use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::country::Country;
use super::error::{check_amount, check_rate, EngineError};
use super::rules::DtaRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    Employment,
    Dividends,
    Interest,
    CapitalGains,
    Pensions,
}

impl IncomeType {
    pub fn display(&self) -> &'static str {
        match self {
            IncomeType::Employment => "Employment",
            IncomeType::Dividends => "Dividends",
            IncomeType::Interest => "Interest",
            IncomeType::CapitalGains => "Capital gains",
            IncomeType::Pensions => "Pensions",
        }
    }
}

/// Where the person is resident for treaty purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Residence {
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "SA")]
    Sa,
    /// Resident in both, tie-breaker not yet applied
    #[serde(rename = "DUAL")]
    Dual,
}

impl Residence {
    pub fn sole(self) -> Option<Country> {
        match self {
            Residence::Uk => Some(Country::Uk),
            Residence::Sa => Some(Country::Sa),
            Residence::Dual => None,
        }
    }
}

impl From<Country> for Residence {
    fn from(country: Country) -> Self {
        match country {
            Country::Uk => Residence::Uk,
            Country::Sa => Residence::Sa,
        }
    }
}

impl FromStr for Residence {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DUAL" | "BOTH" => Ok(Residence::Dual),
            _ => s.parse::<Country>().map(Residence::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    ImmovableProperty,
    /// Business property of a permanent establishment
    PermanentEstablishment,
    Shares,
    Other,
}

impl FromStr for AssetCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "immovable_property" | "property" => Ok(AssetCategory::ImmovableProperty),
            "permanent_establishment" | "pe" => Ok(AssetCategory::PermanentEstablishment),
            "shares" => Ok(AssetCategory::Shares),
            "other" => Ok(AssetCategory::Other),
            _ => Err(EngineError::UnknownAssetCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PensionType {
    Private,
    GovernmentService,
}

impl FromStr for PensionType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "private" => Ok(PensionType::Private),
            "government_service" | "government" => Ok(PensionType::GovernmentService),
            _ => Err(EngineError::UnknownPensionType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EmploymentIncomeInput {
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// Country where the work is performed
    pub source_country: Country,
    pub residence: Residence,
    #[schemars(with = "f64")]
    pub source_rate: Decimal,
    /// Rate charged by the residence country, or by the non-source country for dual residents
    #[schemars(with = "f64")]
    pub residence_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DividendInput {
    #[schemars(with = "f64")]
    pub amount: Decimal,
    pub source_country: Country,
    pub residence_country: Country,
    /// Overrides the treaty withholding rate
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub withholding_rate: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub residence_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InterestInput {
    #[schemars(with = "f64")]
    pub amount: Decimal,
    pub source_country: Country,
    pub residence_country: Country,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub residence_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CapitalGainInput {
    #[schemars(with = "f64")]
    pub gain: Decimal,
    pub asset_category: AssetCategory,
    /// Where the property is situated or the permanent establishment is located
    #[serde(default)]
    pub asset_country: Option<Country>,
    pub residence_country: Country,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub source_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub residence_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PensionInput {
    #[schemars(with = "f64")]
    pub amount: Decimal,
    pub pension_type: PensionType,
    pub paying_country: Country,
    pub residence_country: Country,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub source_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub residence_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DtaReliefResult {
    pub income_type: IncomeType,
    /// Country with the primary taxing right, `None` while residence is undecided
    pub taxing_country: Option<Country>,
    #[schemars(with = "f64")]
    pub source_tax: Decimal,
    #[schemars(with = "f64")]
    pub residence_tax: Decimal,
    #[schemars(with = "f64")]
    pub relief_amount: Decimal,
    /// Tax borne in both countries after relief
    #[schemars(with = "f64")]
    pub net_tax: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub withholding_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub withholding_tax: Option<Decimal>,
    pub provisional: bool,
    pub explanation: String,
}

/// Amounts computed before rounding into a result
struct Settlement {
    taxing_country: Option<Country>,
    source_tax: Decimal,
    residence_tax: Decimal,
    relief: Decimal,
}

impl Settlement {
    fn into_result(
        self,
        income_type: IncomeType,
        rules: &DtaRules,
        explanation: String,
    ) -> DtaReliefResult {
        let dp = rules.money_decimal_places;
        let source_tax = self.source_tax.round_dp(dp);
        let residence_tax = self.residence_tax.round_dp(dp);
        let relief_amount = self.relief.round_dp(dp);
        // credit beyond the residence country's own tax is not refunded
        let net_tax = source_tax + (residence_tax - relief_amount).max(Decimal::ZERO);
        DtaReliefResult {
            income_type,
            taxing_country: self.taxing_country,
            source_tax,
            residence_tax,
            relief_amount,
            net_tax,
            withholding_rate: None,
            withholding_tax: None,
            provisional: false,
            explanation,
        }
    }
}

/// Employment and business income: taxed where earned, with a credit in the residence country
pub fn employment_relief(
    input: &EmploymentIncomeInput,
    rules: &DtaRules,
) -> Result<DtaReliefResult, EngineError> {
    let amount = check_amount("amount", input.amount)?;
    let source_rate = check_rate("source_rate", input.source_rate)?;
    let residence_rate = check_rate("residence_rate", input.residence_rate)?;
    let source = input.source_country;
    let source_tax = amount * source_rate;

    let result = match input.residence.sole() {
        Some(residence) if residence == source => Settlement {
            taxing_country: Some(source),
            source_tax,
            residence_tax: Decimal::ZERO,
            relief: Decimal::ZERO,
        }
        .into_result(
            IncomeType::Employment,
            rules,
            format!(
                "Income earned in {} by a {} resident is taxed only there; no treaty relief applies",
                source, source
            ),
        ),
        Some(residence) => {
            let residence_tax = amount * residence_rate;
            let relief = source_tax.min(residence_tax);
            Settlement {
                taxing_country: Some(source),
                source_tax,
                residence_tax,
                relief,
            }
            .into_result(
                IncomeType::Employment,
                rules,
                format!(
                    "Taxed in {} where the work is performed; {} taxes worldwide income and credits \
                     the {} tax up to its own tax on the income",
                    source, residence, source
                ),
            )
        }
        None => {
            let residence_tax = amount * residence_rate;
            let relief = source_tax.min(residence_tax);
            let mut result = Settlement {
                taxing_country: None,
                source_tax,
                residence_tax,
                relief,
            }
            .into_result(
                IncomeType::Employment,
                rules,
                format!(
                    "Provisional: dual resident pending the tie-breaker; taxed in {} where the \
                     work is performed and relieved by the lesser of the two taxes",
                    source
                ),
            );
            result.provisional = true;
            result
        }
    };
    log::debug!("Employment relief: {:?}", result);
    Ok(result)
}

/// Dividends: capped withholding in the source country, full credit in the residence country
pub fn dividend_relief(
    input: &DividendInput,
    rules: &DtaRules,
) -> Result<DtaReliefResult, EngineError> {
    let amount = check_amount("amount", input.amount)?;
    let residence_rate = check_rate("residence_rate", input.residence_rate)?;
    let treaty_rate = match input.withholding_rate {
        Some(rate) => check_rate("withholding_rate", rate)?,
        None => check_rate("dividend_withholding_rate", rules.dividend_withholding_rate)?,
    };
    let residence = input.residence_country;
    let residence_tax = amount * residence_rate;

    if input.source_country == residence {
        let mut result = Settlement {
            taxing_country: Some(residence),
            source_tax: Decimal::ZERO,
            residence_tax,
            relief: Decimal::ZERO,
        }
        .into_result(
            IncomeType::Dividends,
            rules,
            format!(
                "Dividend paid by a {} company to a {} resident: no withholding and no relief",
                residence, residence
            ),
        );
        result.withholding_rate = Some(Decimal::ZERO);
        result.withholding_tax = Some(Decimal::ZERO);
        return Ok(result);
    }

    let withholding = (amount * treaty_rate).round_dp(rules.money_decimal_places);
    let mut result = Settlement {
        taxing_country: Some(residence),
        source_tax: withholding,
        residence_tax,
        relief: withholding,
    }
    .into_result(
        IncomeType::Dividends,
        rules,
        format!(
            "{} withholds {}% on the dividend; {} grants full credit for the withholding",
            input.source_country,
            (treaty_rate * Decimal::ONE_HUNDRED).normalize(),
            residence
        ),
    );
    result.withholding_rate = Some(treaty_rate);
    result.withholding_tax = Some(withholding);
    log::debug!("Dividend relief: {:?}", result);
    Ok(result)
}

/// Interest: no treaty withholding, taxed in the residence country only
pub fn interest_relief(
    input: &InterestInput,
    rules: &DtaRules,
) -> Result<DtaReliefResult, EngineError> {
    let amount = check_amount("amount", input.amount)?;
    let residence_rate = check_rate("residence_rate", input.residence_rate)?;
    let treaty_rate = check_rate("interest_withholding_rate", rules.interest_withholding_rate)?;
    let residence = input.residence_country;
    let withholding_rate = if input.source_country == residence {
        Decimal::ZERO
    } else {
        treaty_rate
    };
    let withholding = (amount * withholding_rate).round_dp(rules.money_decimal_places);

    let mut result = Settlement {
        taxing_country: Some(residence),
        source_tax: withholding,
        residence_tax: amount * residence_rate,
        relief: withholding,
    }
    .into_result(
        IncomeType::Interest,
        rules,
        format!(
            "Interest is taxed only in {} where the recipient is resident; {} withholds {}%",
            residence,
            input.source_country,
            (withholding_rate * Decimal::ONE_HUNDRED).normalize()
        ),
    );
    result.withholding_rate = Some(withholding_rate);
    result.withholding_tax = Some(withholding);
    Ok(result)
}

/// Capital gains: taxing right follows the asset category
pub fn capital_gains_relief(
    input: &CapitalGainInput,
    rules: &DtaRules,
) -> Result<DtaReliefResult, EngineError> {
    let gain = check_amount("gain", input.gain)?;
    let source_rate = check_rate("source_rate", input.source_rate)?;
    let residence_rate = check_rate("residence_rate", input.residence_rate)?;
    let residence = input.residence_country;

    let (taxing_country, basis) = match input.asset_category {
        AssetCategory::ImmovableProperty => (
            input
                .asset_country
                .ok_or(EngineError::MissingAssetLocation(input.asset_category))?,
            "immovable property is taxed where it is situated",
        ),
        AssetCategory::PermanentEstablishment => (
            input
                .asset_country
                .ok_or(EngineError::MissingAssetLocation(input.asset_category))?,
            "permanent establishment property is taxed where the establishment is",
        ),
        AssetCategory::Shares | AssetCategory::Other => (
            residence,
            "gains on shares and other assets are taxed in the residence country",
        ),
    };

    let residence_tax = gain * residence_rate;
    let settlement = if taxing_country == residence {
        Settlement {
            taxing_country: Some(residence),
            source_tax: Decimal::ZERO,
            residence_tax,
            relief: Decimal::ZERO,
        }
    } else {
        let source_tax = gain * source_rate;
        Settlement {
            taxing_country: Some(taxing_country),
            source_tax,
            residence_tax,
            relief: source_tax.min(residence_tax),
        }
    };
    let explanation = if taxing_country == residence {
        format!("Taxed in {}: {}", residence, basis)
    } else {
        format!(
            "Taxed in {}: {}; {} credits the {} tax up to its own tax on the gain",
            taxing_country, basis, residence, taxing_country
        )
    };
    Ok(settlement.into_result(IncomeType::CapitalGains, rules, explanation))
}

/// Pensions: private pensions follow residence, government service pensions follow the payer
pub fn pension_relief(
    input: &PensionInput,
    rules: &DtaRules,
) -> Result<DtaReliefResult, EngineError> {
    let amount = check_amount("amount", input.amount)?;
    let source_rate = check_rate("source_rate", input.source_rate)?;
    let residence_rate = check_rate("residence_rate", input.residence_rate)?;

    let result = match input.pension_type {
        PensionType::Private => Settlement {
            taxing_country: Some(input.residence_country),
            source_tax: Decimal::ZERO,
            residence_tax: amount * residence_rate,
            relief: Decimal::ZERO,
        }
        .into_result(
            IncomeType::Pensions,
            rules,
            format!(
                "Private pension taxed only in {} where the recipient is resident",
                input.residence_country
            ),
        ),
        PensionType::GovernmentService => Settlement {
            taxing_country: Some(input.paying_country),
            source_tax: amount * source_rate,
            residence_tax: Decimal::ZERO,
            relief: Decimal::ZERO,
        }
        .into_result(
            IncomeType::Pensions,
            rules,
            format!(
                "Government service pension taxed only in {} which pays it",
                input.paying_country
            ),
        ),
    };
    Ok(result)
}
