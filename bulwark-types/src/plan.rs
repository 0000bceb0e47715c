use crate::action::ActionStep;
use crate::proposal::ProposedPlan;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Risk classification that bounds the plausible aggregate yield.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Conservative,
    Balanced,
    Aggressive,
}

impl Tier {
    /// Strategy names used by the recommendation engine (Anchor, Zenith,
    /// Wildcard) are accepted alongside the tier names themselves.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "conservative" | "anchor" => Some(Self::Conservative),
            "balanced" | "zenith" => Some(Self::Balanced),
            "aggressive" | "wildcard" => Some(Self::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repaired plan: every step is feasible against the cumulative simulated
/// balances at its position.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Plan {
    pub tier_name: String,
    pub risk_level: i32,
    pub steps: Vec<ActionStep>,
    pub explanation: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub aggregate_yield: Decimal,
    pub risk_factors: Vec<String>,
}

impl Plan {
    pub fn tier(&self) -> Option<Tier> {
        Tier::from_name(&self.tier_name)
    }

    /// Re-express the plan in the untrusted input shape, e.g. to feed it back
    /// through validation.
    pub fn to_proposal(&self) -> ProposedPlan {
        ProposedPlan {
            tier_name: self.tier_name.clone(),
            risk_level: self.risk_level,
            steps: self.steps.iter().map(ActionStep::to_proposed).collect(),
            explanation: self.explanation.clone(),
            aggregate_yield: Some(self.aggregate_yield),
            risk_factors: self.risk_factors.clone(),
        }
    }

    /// Content hash over the JSON form, as handed to the transport layer.
    pub fn fingerprint(&self) -> [u8; 32] {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        *blake3::hash(&encoded).as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use rust_decimal_macros::dec;

    fn sample_plan() -> Plan {
        Plan {
            tier_name: "Zenith".into(),
            risk_level: 3,
            steps: vec![ActionStep {
                protocol: "AAVE".into(),
                action: Action::Deposit,
                token: "USDC".into(),
                amount: dec!(95.00),
                expected_yield: dec!(3.75),
            }],
            explanation: "Supply USDC".into(),
            aggregate_yield: dec!(5),
            risk_factors: vec!["Smart contract risk".into()],
        }
    }

    #[test]
    fn tier_names_resolve() {
        assert_eq!(Tier::from_name("Anchor"), Some(Tier::Conservative));
        assert_eq!(Tier::from_name(" BALANCED "), Some(Tier::Balanced));
        assert_eq!(Tier::from_name("wildcard"), Some(Tier::Aggressive));
        assert_eq!(Tier::from_name("moonshot"), None);
    }

    #[test]
    fn plan_serializes_numbers_as_numbers() {
        let json = serde_json::to_value(sample_plan()).unwrap();
        assert_eq!(json["aggregate_yield"], 5.0);
        assert_eq!(json["steps"][0]["amount"], 95.0);
        assert_eq!(json["steps"][0]["action"], "deposit");
    }

    #[test]
    fn fingerprint_ignores_decimal_scale() {
        let plan = sample_plan();
        let mut rescaled = plan.clone();
        rescaled.steps[0].amount = dec!(95);
        assert_eq!(plan, rescaled);
        assert_eq!(plan.fingerprint(), rescaled.fingerprint());
    }

    #[test]
    fn proposal_keeps_plan_metadata() {
        let plan = sample_plan();
        let proposal = plan.to_proposal();
        assert_eq!(proposal.tier_name, "Zenith");
        assert_eq!(proposal.risk_level, 3);
        assert_eq!(proposal.steps.len(), 1);
        assert_eq!(proposal.aggregate_yield, Some(dec!(5)));
    }
}
