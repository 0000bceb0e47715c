//! Untrusted plan shape as emitted by the recommendation engine.
//!
//! Every field is optional and numbers may arrive as JSON numbers or as
//! strings with thousands separators. Nothing here is validated; turning a
//! [`ProposedStep`] into an [`crate::ActionStep`] is where shape checks live.

use crate::token::TokenSymbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProposedStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenSymbol>,
    #[serde(default, with = "loose", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(
        default,
        alias = "expected_apy",
        with = "loose",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_yield: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_to: Option<TokenSymbol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    #[serde(default, with = "loose", skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Decimal>,
    #[serde(
        default,
        alias = "usdq_amount",
        with = "loose",
        skip_serializing_if = "Option::is_none"
    )]
    pub minted_amount: Option<Decimal>,
}

/// Plan-level fields are as forgiving as step fields: `null` reads as the
/// empty value and `risk_level` may arrive as a string.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProposedPlan {
    #[serde(default, alias = "name", deserialize_with = "lenient::or_default")]
    pub tier_name: String,
    #[serde(default, deserialize_with = "lenient::level")]
    pub risk_level: i32,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub steps: Vec<ProposedStep>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub explanation: String,
    #[serde(
        default,
        alias = "total_expected_apy",
        with = "loose",
        skip_serializing_if = "Option::is_none"
    )]
    pub aggregate_yield: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub risk_factors: Vec<String>,
}

mod lenient {
    use super::loose;
    use rust_decimal::prelude::ToPrimitive;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Integer risk level from a number or numeric string; anything else is 0.
    pub fn level<'de, D>(deserializer: D) -> Result<i32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(loose::parse_value)
            .and_then(|level| level.round().to_i32())
            .unwrap_or_default())
    }
}

/// Tolerant decimal (de)serialization for generator output.
///
/// Unparseable values become `None` instead of failing the whole plan, which
/// downstream turns into a dropped step rather than a rejected request.
pub mod loose {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use std::str::FromStr;

    pub fn serialize<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::float_option::serialize(value, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(parse_value))
    }

    pub fn parse_value(value: &Value) -> Option<Decimal> {
        match value {
            Value::Number(n) => parse_str(&n.to_string()),
            Value::String(s) => parse_str(s),
            _ => None,
        }
    }

    pub fn parse_str(raw: &str) -> Option<Decimal> {
        let cleaned: String = raw
            .chars()
            .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
            .collect();
        let cleaned = cleaned.trim_end_matches('%');
        if cleaned.is_empty() {
            return None;
        }
        Decimal::from_str(cleaned)
            .or_else(|_| Decimal::from_scientific(cleaned))
            .ok()
    }
}
