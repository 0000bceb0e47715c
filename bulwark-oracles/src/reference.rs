use crate::aliases::AliasTable;
use crate::prices::PriceReference;
use bulwark_types::TokenSymbol;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to read reference file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid reference configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid token symbol '{0}' in reference configuration")]
    EmptySymbol(String),
}

/// Process-wide reference data, loaded once at startup and shared read-only
/// (typically behind an `Arc`) by every validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    aliases: AliasTable,
    prices: PriceReference,
    synthetic_token: TokenSymbol,
    fallback_asset: TokenSymbol,
}

impl Default for Reference {
    /// Tables used when no chain data is available: Scroll token aliases,
    /// collateral prices from the CDP branch defaults, and USDQ as the
    /// synthetic stable token.
    fn default() -> Self {
        let aliases = AliasTable::new()
            .with_alias("WETH", "ETH")
            .with_alias("SCR", "SRC");

        let prices = PriceReference::new()
            .with_price("WETH", Decimal::from(2000))
            .with_price("wstETH", Decimal::from(2100))
            .with_price("weETH", Decimal::from(2080))
            .with_price("SCR", Decimal::from(10))
            .with_price("USDC", Decimal::ONE)
            .with_price("USDQ", Decimal::ONE);

        Self::new(aliases, prices)
    }
}

impl Reference {
    pub fn new(aliases: AliasTable, prices: PriceReference) -> Self {
        Self {
            aliases,
            prices,
            synthetic_token: TokenSymbol::from("USDQ"),
            fallback_asset: TokenSymbol::from("USDC"),
        }
    }

    pub fn with_synthetic_token(mut self, token: impl Into<TokenSymbol>) -> Self {
        self.synthetic_token = self.aliases.canonicalize(&token.into());
        self
    }

    pub fn with_fallback_asset(mut self, token: impl Into<TokenSymbol>) -> Self {
        self.fallback_asset = self.aliases.canonicalize(&token.into());
        self
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn prices(&self) -> &PriceReference {
        &self.prices
    }

    pub fn canonicalize(&self, symbol: &TokenSymbol) -> TokenSymbol {
        self.aliases.canonicalize(symbol)
    }

    /// Price of `symbol` after alias resolution.
    pub fn price_of(&self, symbol: &TokenSymbol) -> Decimal {
        self.prices.price_of(&self.canonicalize(symbol))
    }

    pub fn synthetic_token(&self) -> &TokenSymbol {
        &self.synthetic_token
    }

    /// Asset named by the fallback deposit when the wallet holds nothing of value.
    pub fn fallback_asset(&self) -> &TokenSymbol {
        &self.fallback_asset
    }

    pub fn from_config(config: ReferenceConfig) -> Result<Self, ReferenceError> {
        let mut reference = if config.replace_defaults {
            Self::new(AliasTable::new(), PriceReference::new())
        } else {
            Self::default()
        };

        for (canonical, display) in config.aliases {
            if canonical.is_empty() || display.is_empty() {
                return Err(ReferenceError::EmptySymbol(format!("{canonical}->{display}")));
            }
            reference.aliases.insert(canonical, display);
        }

        // Price keys may be written with display names; store them canonically.
        for (symbol, price) in config.prices {
            if symbol.is_empty() {
                return Err(ReferenceError::EmptySymbol(symbol.to_string()));
            }
            let canonical = reference.aliases.canonicalize(&symbol);
            reference.prices.set_price(canonical, price);
        }

        if let Some(price) = config.default_price {
            reference.prices = reference.prices.with_default_price(price);
        }
        if let Some(token) = config.synthetic_token {
            reference = reference.with_synthetic_token(token);
        }
        if let Some(token) = config.fallback_asset {
            reference = reference.with_fallback_asset(token);
        }
        Ok(reference)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ReferenceError> {
        let config: ReferenceConfig = serde_json::from_str(raw)?;
        Self::from_config(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let reference = Self::from_json_str(&raw)?;
        info!(
            "Loaded reference tables from {} ({} aliases, synthetic token {})",
            path.display(),
            reference.aliases.len(),
            reference.synthetic_token
        );
        Ok(reference)
    }
}

/// On-disk form of [`Reference`]. Entries are layered over the built-in
/// defaults unless `replace_defaults` is set.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceConfig {
    pub replace_defaults: bool,
    /// canonical -> display
    pub aliases: BTreeMap<TokenSymbol, TokenSymbol>,
    pub prices: BTreeMap<TokenSymbol, Decimal>,
    pub default_price: Option<Decimal>,
    pub synthetic_token: Option<TokenSymbol>,
    pub fallback_asset: Option<TokenSymbol>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_price_aliased_symbols() {
        let reference = Reference::default();
        assert_eq!(reference.price_of(&"ETH".into()), dec!(2000));
        assert_eq!(reference.price_of(&"SRC".into()), dec!(10));
        assert_eq!(reference.synthetic_token(), &TokenSymbol::from("USDQ"));
    }

    #[test]
    fn config_layers_over_defaults() {
        let reference = Reference::from_json_str(
            r#"{
                "aliases": {"WBTC": "BTC"},
                "prices": {"BTC": 90000, "ETH": "2500"},
                "synthetic_token": "USDQ"
            }"#,
        )
        .unwrap();

        assert_eq!(reference.price_of(&"WBTC".into()), dec!(90000));
        assert_eq!(reference.price_of(&"WETH".into()), dec!(2500));
        assert_eq!(reference.price_of(&"USDC".into()), dec!(1));
    }

    #[test]
    fn config_can_replace_defaults() {
        let reference = Reference::from_json_str(
            r#"{"replace_defaults": true, "prices": {"A": 2000}, "default_price": 0}"#,
        )
        .unwrap();

        assert!(reference.aliases().is_empty());
        assert_eq!(reference.price_of(&"A".into()), dec!(2000));
        assert_eq!(reference.price_of(&"WETH".into()), dec!(0));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Reference::from_json_str(r#"{"oracle_url": "http://x"}"#).unwrap_err();
        assert!(matches!(err, ReferenceError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Reference::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
