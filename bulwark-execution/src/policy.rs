use bulwark_types::Tier;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Inclusive bounds on a tier's aggregate yield.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct YieldBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl YieldBand {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: Decimal) -> Decimal {
        value.max(self.min).min(self.max)
    }
}

/// Business thresholds for repair. The defaults are the values the strategy
/// service has always used; none of them is derived from anything.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepairPolicy {
    /// Fraction of the available balance a short step is shrunk to.
    pub shrink_margin: Decimal,
    /// Fraction of the richest holding used by the fallback deposit.
    pub fallback_fraction: Decimal,
    /// Share of total collateral value that may be minted as synthetic debt.
    pub mint_cap_ratio: Decimal,
    /// Minting is always allowed up to this amount.
    pub mint_cap_floor: Decimal,
    pub fallback_yield: Decimal,
    pub fallback_protocol: String,
    pub yield_floor: Decimal,
    pub conservative: YieldBand,
    pub balanced: YieldBand,
    pub aggressive: YieldBand,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            shrink_margin: Decimal::new(95, 2),
            fallback_fraction: Decimal::new(90, 2),
            mint_cap_ratio: Decimal::new(2, 1),
            mint_cap_floor: Decimal::from(5),
            fallback_yield: Decimal::from(2),
            fallback_protocol: "AAVE".to_string(),
            yield_floor: Decimal::ONE,
            conservative: YieldBand::new(Decimal::from(2), Decimal::from(5)),
            balanced: YieldBand::new(Decimal::from(5), Decimal::from(15)),
            aggressive: YieldBand::new(Decimal::from(15), Decimal::from(30)),
        }
    }
}

impl RepairPolicy {
    pub fn band(&self, tier: Tier) -> YieldBand {
        match tier {
            Tier::Conservative => self.conservative,
            Tier::Balanced => self.balanced,
            Tier::Aggressive => self.aggressive,
        }
    }

    pub fn mint_cap(&self, collateral_value: Decimal) -> Decimal {
        collateral_value
            .saturating_mul(self.mint_cap_ratio)
            .max(self.mint_cap_floor)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn band_clamps_both_ways() {
        let band = YieldBand::new(dec!(2), dec!(5));
        assert_eq!(band.clamp(dec!(12)), dec!(5));
        assert_eq!(band.clamp(dec!(1)), dec!(2));
        assert_eq!(band.clamp(dec!(3.3)), dec!(3.3));
    }

    #[test]
    fn mint_cap_has_a_floor() {
        let policy = RepairPolicy::default();
        assert_eq!(policy.mint_cap(dec!(20000)), dec!(4000));
        assert_eq!(policy.mint_cap(dec!(10)), dec!(5));
    }

    #[test]
    fn partial_policy_keeps_defaults() {
        let policy = RepairPolicy::from_json_str(
            r#"{"shrink_margin": 0.9, "aggressive": {"min": 10, "max": 40}}"#,
        )
        .unwrap();
        assert_eq!(policy.shrink_margin, dec!(0.9));
        assert_eq!(policy.fallback_fraction, dec!(0.90));
        assert_eq!(policy.band(Tier::Aggressive), YieldBand::new(dec!(10), dec!(40)));
        assert_eq!(policy.band(Tier::Balanced), YieldBand::new(dec!(5), dec!(15)));
    }
}
