use bulwark_oracles::PriceReference;
use bulwark_types::{TokenSymbol, WalletBalances};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-token flow over one validation pass.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenFlow {
    #[serde(with = "rust_decimal::serde::float")]
    pub initial: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub produced: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub consumed: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub borrowed: Decimal,
}

impl TokenFlow {
    pub fn closing(&self) -> Decimal {
        self.initial
            .saturating_add(self.produced)
            .saturating_sub(self.consumed)
    }
}

/// Working copy of a wallet, advanced one step at a time.
///
/// Keys are canonical symbols; the caller resolves aliases before touching
/// the state. Owned by exactly one validation pass.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    balances: BTreeMap<TokenSymbol, Decimal>,
    initial: BTreeMap<TokenSymbol, Decimal>,
    produced: BTreeMap<TokenSymbol, Decimal>,
    consumed: BTreeMap<TokenSymbol, Decimal>,
    borrowed: BTreeMap<TokenSymbol, Decimal>,
}

impl SimulationState {
    /// Negative wallet amounts are a caller bug; they start out as zero here.
    pub fn new(wallet: &WalletBalances, synthetic: &TokenSymbol) -> Self {
        let balances: BTreeMap<TokenSymbol, Decimal> = wallet
            .iter()
            .map(|(token, amount)| (token.clone(), (*amount).max(Decimal::ZERO)))
            .collect();

        let mut borrowed: BTreeMap<TokenSymbol, Decimal> = balances
            .keys()
            .map(|token| (token.clone(), Decimal::ZERO))
            .collect();
        borrowed.entry(synthetic.clone()).or_insert(Decimal::ZERO);

        let mut state = Self {
            initial: balances.clone(),
            balances,
            borrowed,
            ..Default::default()
        };
        state.balances.entry(synthetic.clone()).or_insert(Decimal::ZERO);
        state
    }

    pub fn available(&self, token: &TokenSymbol) -> Decimal {
        self.balances
            .get(token)
            .copied()
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO)
    }

    /// Callers check [`Self::available`] first; the balance never goes negative.
    pub fn consume(&mut self, token: &TokenSymbol, amount: Decimal) {
        debug_assert!(amount <= self.available(token), "overdraw of {token}");
        let balance = self.balances.entry(token.clone()).or_insert(Decimal::ZERO);
        *balance = (*balance - amount).max(Decimal::ZERO);
        let consumed = self.consumed.entry(token.clone()).or_insert(Decimal::ZERO);
        *consumed = consumed.saturating_add(amount);
    }

    pub fn produce(&mut self, token: &TokenSymbol, amount: Decimal) {
        let balance = self.balances.entry(token.clone()).or_insert(Decimal::ZERO);
        *balance = balance.saturating_add(amount);
        let produced = self.produced.entry(token.clone()).or_insert(Decimal::ZERO);
        *produced = produced.saturating_add(amount);
    }

    pub fn record_borrowed(&mut self, token: &TokenSymbol, amount: Decimal) {
        let borrowed = self.borrowed.entry(token.clone()).or_insert(Decimal::ZERO);
        *borrowed = borrowed.saturating_add(amount);
    }

    pub fn borrowed(&self, token: &TokenSymbol) -> Decimal {
        self.borrowed.get(token).copied().unwrap_or(Decimal::ZERO)
    }

    /// Tokens with a positive working balance, in symbol order.
    pub fn holdings(&self) -> impl Iterator<Item = (&TokenSymbol, Decimal)> {
        self.balances
            .iter()
            .filter(|(_, amount)| **amount > Decimal::ZERO)
            .map(|(token, amount)| (token, *amount))
    }

    /// USD value of everything currently held except `exclude`. Saturates
    /// rather than overflowing on absurd inputs.
    pub fn collateral_value(&self, prices: &PriceReference, exclude: &TokenSymbol) -> Decimal {
        self.holdings()
            .filter(|(token, _)| *token != exclude)
            .map(|(token, amount)| amount.saturating_mul(prices.price_of(token)))
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Holding with the greatest USD value; ties go to the smaller symbol.
    pub fn richest(&self, prices: &PriceReference) -> Option<(TokenSymbol, Decimal)> {
        let mut best: Option<(&TokenSymbol, Decimal)> = None;
        for (token, amount) in self.holdings() {
            let value = amount.saturating_mul(prices.price_of(token));
            if value <= Decimal::ZERO {
                continue;
            }
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((token, value)),
            }
        }
        best.map(|(token, value)| (token.clone(), value))
    }

    pub fn ledger(&self) -> BTreeMap<TokenSymbol, TokenFlow> {
        let mut ledger: BTreeMap<TokenSymbol, TokenFlow> = BTreeMap::new();
        for (token, amount) in &self.initial {
            ledger.entry(token.clone()).or_default().initial = *amount;
        }
        for (token, amount) in &self.produced {
            ledger.entry(token.clone()).or_default().produced = *amount;
        }
        for (token, amount) in &self.consumed {
            ledger.entry(token.clone()).or_default().consumed = *amount;
        }
        for (token, amount) in &self.borrowed {
            ledger.entry(token.clone()).or_default().borrowed = *amount;
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wallet(entries: &[(&str, Decimal)]) -> WalletBalances {
        entries
            .iter()
            .map(|(token, amount)| (TokenSymbol::from(*token), *amount))
            .collect()
    }

    #[test]
    fn synthetic_token_starts_at_zero() {
        let state = SimulationState::new(&wallet(&[("WETH", dec!(1))]), &"USDQ".into());
        assert_eq!(state.available(&"USDQ".into()), Decimal::ZERO);
        assert_eq!(state.borrowed(&"USDQ".into()), Decimal::ZERO);
        assert_eq!(state.borrowed(&"WETH".into()), Decimal::ZERO);
    }

    #[test]
    fn negative_wallet_amounts_are_unavailable() {
        let state = SimulationState::new(&wallet(&[("USDC", dec!(-5))]), &"USDQ".into());
        assert_eq!(state.available(&"USDC".into()), Decimal::ZERO);
        assert_eq!(state.ledger()[&TokenSymbol::from("USDC")].closing(), Decimal::ZERO);
    }

    #[test]
    fn flows_are_tracked_separately_from_balance() {
        let mut state = SimulationState::new(&wallet(&[("USDC", dec!(100))]), &"USDQ".into());
        state.consume(&"USDC".into(), dec!(40));
        state.produce(&"USDQ".into(), dec!(25));
        state.record_borrowed(&"USDQ".into(), dec!(25));

        assert_eq!(state.available(&"USDC".into()), dec!(60));
        assert_eq!(state.available(&"USDQ".into()), dec!(25));

        let ledger = state.ledger();
        let usdc = ledger[&TokenSymbol::from("USDC")];
        assert_eq!(usdc.consumed, dec!(40));
        assert_eq!(usdc.closing(), dec!(60));
        let usdq = ledger[&TokenSymbol::from("USDQ")];
        assert_eq!(usdq.borrowed, dec!(25));
        assert_eq!(usdq.closing(), dec!(25));
    }

    #[test]
    fn collateral_value_skips_excluded_token() {
        let mut state = SimulationState::new(
            &wallet(&[("WETH", dec!(2)), ("USDC", dec!(100))]),
            &"USDQ".into(),
        );
        state.produce(&"USDQ".into(), dec!(500));
        let prices = PriceReference::new().with_price("WETH", dec!(2000));
        assert_eq!(state.collateral_value(&prices, &"USDQ".into()), dec!(4100));
    }

    #[test]
    fn richest_prefers_value_then_symbol() {
        let prices = PriceReference::new()
            .with_price("A", dec!(1))
            .with_price("B", dec!(2000))
            .with_price("C", dec!(2000));
        let state = SimulationState::new(
            &wallet(&[("A", dec!(10)), ("B", dec!(1)), ("C", dec!(1))]),
            &"USDQ".into(),
        );
        assert_eq!(state.richest(&prices), Some(("B".into(), dec!(2000))));
    }

    #[test]
    fn empty_wallet_has_no_richest_token() {
        let state = SimulationState::new(&WalletBalances::new(), &"USDQ".into());
        assert_eq!(state.richest(&PriceReference::new()), None);
    }
}
