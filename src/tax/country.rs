use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::EngineError;

/// One of the two treaty jurisdictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Country {
    #[serde(rename = "UK", alias = "GB")]
    Uk,
    #[serde(rename = "SA", alias = "ZA")]
    Sa,
}

impl Country {
    pub fn code(self) -> &'static str {
        match self {
            Country::Uk => "UK",
            Country::Sa => "SA",
        }
    }

    pub fn other(self) -> Country {
        match self {
            Country::Uk => Country::Sa,
            Country::Sa => Country::Uk,
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UK" | "GB" | "GBR" => Ok(Country::Uk),
            "SA" | "ZA" | "ZAF" => Ok(Country::Sa),
            _ => Err(EngineError::UnknownCountry(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Nationality {
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "SA")]
    Sa,
    #[serde(rename = "BOTH")]
    Both,
}

impl Nationality {
    /// The single country of nationality, if there is exactly one
    pub fn sole_country(self) -> Option<Country> {
        match self {
            Nationality::Uk => Some(Country::Uk),
            Nationality::Sa => Some(Country::Sa),
            Nationality::Both => None,
        }
    }
}

impl FromStr for Nationality {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BOTH" => Ok(Nationality::Both),
            other => match other.parse::<Country>() {
                Ok(Country::Uk) => Ok(Nationality::Uk),
                Ok(Country::Sa) => Ok(Nationality::Sa),
                Err(_) => Err(EngineError::UnknownNationality(s.to_string())),
            },
        }
    }
}
