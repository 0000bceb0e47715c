use bulwark_types::TokenSymbol;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Fallback USD prices keyed by canonical symbol.
///
/// Not a live oracle: these only bound synthetic minting and pick the
/// fallback asset. Unknown symbols price at `default_price` (1.0 unless
/// configured), which silently skews capacity checks for unpriced tokens;
/// callers that care use [`PriceReference::is_priced`].
#[derive(Debug, Clone, PartialEq)]
pub struct PriceReference {
    prices: BTreeMap<TokenSymbol, Decimal>,
    default_price: Decimal,
}

impl Default for PriceReference {
    fn default() -> Self {
        Self {
            prices: BTreeMap::new(),
            default_price: Decimal::ONE,
        }
    }
}

impl PriceReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: impl Into<TokenSymbol>, price: Decimal) -> Self {
        self.set_price(symbol.into(), price);
        self
    }

    pub fn with_default_price(mut self, price: Decimal) -> Self {
        self.default_price = price.max(Decimal::ZERO);
        self
    }

    /// Negative prices are stored as zero.
    pub fn set_price(&mut self, symbol: TokenSymbol, price: Decimal) {
        self.prices.insert(symbol, price.max(Decimal::ZERO));
    }

    pub fn price_of(&self, symbol: &TokenSymbol) -> Decimal {
        self.prices
            .get(symbol)
            .copied()
            .unwrap_or(self.default_price)
    }

    pub fn is_priced(&self, symbol: &TokenSymbol) -> bool {
        self.prices.contains_key(symbol)
    }

    pub fn default_price(&self) -> Decimal {
        self.default_price
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TokenSymbol, &Decimal)> {
        self.prices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unknown_tokens_use_default_price() {
        let prices = PriceReference::new().with_price("WETH", dec!(2000));
        assert_eq!(prices.price_of(&"WETH".into()), dec!(2000));
        assert_eq!(prices.price_of(&"DOGE".into()), Decimal::ONE);
        assert!(!prices.is_priced(&"DOGE".into()));
    }

    #[test]
    fn default_price_is_configurable() {
        let prices = PriceReference::new().with_default_price(dec!(0));
        assert_eq!(prices.price_of(&"DOGE".into()), Decimal::ZERO);
    }

    #[test]
    fn negative_prices_clamp_to_zero() {
        let prices = PriceReference::new().with_price("BAD", dec!(-3));
        assert_eq!(prices.price_of(&"BAD".into()), Decimal::ZERO);
    }
}
