use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque token identifier. Only canonical symbols may be compared or used
/// as balance keys; run raw symbols through the alias table first.
///
/// Surrounding whitespace is stripped on every construction path, including
/// deserialization.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(transparent)]
pub struct TokenSymbol(String);

impl TokenSymbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let trimmed = symbol.trim();
        if trimmed.len() == symbol.len() {
            Self(symbol)
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for TokenSymbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenSymbol {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<String> for TokenSymbol {
    fn from(symbol: String) -> Self {
        Self::new(symbol)
    }
}

impl Borrow<str> for TokenSymbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Token holdings reported for a wallet. Amounts are expected to be
/// non-negative; the engine never mutates the caller's copy.
pub type WalletBalances = BTreeMap<TokenSymbol, Decimal>;
