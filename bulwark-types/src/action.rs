use crate::proposal::ProposedStep;
use crate::token::TokenSymbol;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The closed set of step kinds the engine understands.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Deposit,
    Borrow,
    Swap,
    AddLiquidity,
    MintAgainstCollateral,
    ProvideToPool,
}

impl ActionKind {
    /// Resolves the spellings the recommendation engine is known to emit.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let kind = match normalized.as_str() {
            "deposit" | "supply" | "lend" => Self::Deposit,
            "borrow" => Self::Borrow,
            "swap" => Self::Swap,
            "add_liquidity" | "provide_liquidity" => Self::AddLiquidity,
            "mint_against_collateral" | "borrow_usdq" | "mint" => Self::MintAgainstCollateral,
            "provide_to_pool" | "deposit_stability_pool" | "stability_pool" => {
                Self::ProvideToPool
            }
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Borrow => "borrow",
            Self::Swap => "swap",
            Self::AddLiquidity => "add_liquidity",
            Self::MintAgainstCollateral => "mint_against_collateral",
            Self::ProvideToPool => "provide_to_pool",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind payload. Fields a kind cannot work without are not optional.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Deposit,
    Borrow {
        #[serde(
            with = "rust_decimal::serde::float_option",
            skip_serializing_if = "Option::is_none"
        )]
        interest_rate: Option<Decimal>,
    },
    Swap {
        token_to: TokenSymbol,
    },
    AddLiquidity {
        pair: String,
    },
    /// Lock `amount` of the step token and mint the synthetic stable token.
    MintAgainstCollateral {
        #[serde(with = "rust_decimal::serde::float")]
        minted_amount: Decimal,
        #[serde(
            with = "rust_decimal::serde::float_option",
            skip_serializing_if = "Option::is_none"
        )]
        interest_rate: Option<Decimal>,
    },
    /// Deposit the synthetic token into a yield pool; the step token names
    /// the pool branch.
    ProvideToPool,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Deposit => ActionKind::Deposit,
            Self::Borrow { .. } => ActionKind::Borrow,
            Self::Swap { .. } => ActionKind::Swap,
            Self::AddLiquidity { .. } => ActionKind::AddLiquidity,
            Self::MintAgainstCollateral { .. } => ActionKind::MintAgainstCollateral,
            Self::ProvideToPool => ActionKind::ProvideToPool,
        }
    }
}

/// A well-formed step. Built from a [`ProposedStep`] that passes shape
/// checks, so `amount` is strictly positive.
///
/// The one exception is the fallback deposit synthesized for a wallet with
/// nothing of value: it carries `amount == 0`, and feeding it back through
/// validation reproduces the same fallback.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActionStep {
    pub protocol: String,
    #[serde(flatten)]
    pub action: Action,
    pub token: TokenSymbol,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected_yield: Decimal,
}

impl ActionStep {
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Rewrites every token-bearing field through `f`.
    pub fn map_tokens<F>(mut self, f: F) -> Self
    where
        F: Fn(&TokenSymbol) -> TokenSymbol,
    {
        self.token = f(&self.token);
        match &mut self.action {
            Action::Swap { token_to } => *token_to = f(token_to),
            Action::AddLiquidity { pair } => *pair = map_pair(pair, &f),
            _ => {}
        }
        self
    }

    pub fn to_proposed(&self) -> ProposedStep {
        let mut proposed = ProposedStep {
            protocol: Some(self.protocol.clone()),
            action: Some(self.kind().as_str().to_string()),
            token: Some(self.token.clone()),
            amount: Some(self.amount),
            expected_yield: Some(self.expected_yield),
            ..Default::default()
        };
        match &self.action {
            Action::Borrow { interest_rate } => proposed.interest_rate = *interest_rate,
            Action::Swap { token_to } => proposed.token_to = Some(token_to.clone()),
            Action::AddLiquidity { pair } => proposed.pair = Some(pair.clone()),
            Action::MintAgainstCollateral {
                minted_amount,
                interest_rate,
            } => {
                proposed.minted_amount = Some(*minted_amount);
                proposed.interest_rate = *interest_rate;
            }
            Action::Deposit | Action::ProvideToPool => {}
        }
        proposed
    }
}

/// Pairs are written `A-B` or `A/B`; each side is a token.
fn map_pair<F>(pair: &str, f: &F) -> String
where
    F: Fn(&TokenSymbol) -> TokenSymbol,
{
    let separator = if pair.contains('/') { '/' } else { '-' };
    pair.split(separator)
        .map(|side| f(&TokenSymbol::new(side)).to_string())
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StepShapeError {
    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Field '{field}' must be strictly positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },
}

fn required_text(value: &Option<String>, field: &'static str) -> Result<String, StepShapeError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(StepShapeError::MissingField(field)),
    }
}

fn required_token(
    value: &Option<TokenSymbol>,
    field: &'static str,
) -> Result<TokenSymbol, StepShapeError> {
    match value {
        Some(token) if !token.is_empty() => Ok(token.clone()),
        _ => Err(StepShapeError::MissingField(field)),
    }
}

fn required_positive(
    value: Option<Decimal>,
    field: &'static str,
) -> Result<Decimal, StepShapeError> {
    let value = value.ok_or(StepShapeError::MissingField(field))?;
    if value <= Decimal::ZERO {
        return Err(StepShapeError::NonPositive { field, value });
    }
    Ok(value)
}

impl TryFrom<&ProposedStep> for ActionStep {
    type Error = StepShapeError;

    fn try_from(raw: &ProposedStep) -> Result<Self, Self::Error> {
        let action_name = required_text(&raw.action, "action")?;
        let kind = ActionKind::parse(&action_name)
            .ok_or_else(|| StepShapeError::UnknownAction(action_name.clone()))?;
        let protocol = required_text(&raw.protocol, "protocol")?;
        let token = required_token(&raw.token, "token")?;
        let amount = required_positive(raw.amount, "amount")?;

        let action = match kind {
            ActionKind::Deposit => Action::Deposit,
            ActionKind::Borrow => Action::Borrow {
                interest_rate: raw.interest_rate,
            },
            ActionKind::Swap => Action::Swap {
                token_to: required_token(&raw.token_to, "token_to")?,
            },
            ActionKind::AddLiquidity => Action::AddLiquidity {
                pair: required_text(&raw.pair, "pair")?,
            },
            ActionKind::MintAgainstCollateral => Action::MintAgainstCollateral {
                minted_amount: required_positive(raw.minted_amount, "minted_amount")?,
                interest_rate: raw.interest_rate,
            },
            ActionKind::ProvideToPool => Action::ProvideToPool,
        };

        Ok(ActionStep {
            protocol,
            action,
            token,
            amount,
            expected_yield: raw.expected_yield.unwrap_or(Decimal::ZERO),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn swap_proposal() -> ProposedStep {
        ProposedStep {
            protocol: Some("Ambient".into()),
            action: Some("Swap".into()),
            token: Some("USDC".into()),
            amount: Some(dec!(10)),
            expected_yield: Some(dec!(0)),
            token_to: Some("ETH".into()),
            ..Default::default()
        }
    }

    #[test]
    fn swap_requires_destination() {
        let mut raw = swap_proposal();
        assert!(ActionStep::try_from(&raw).is_ok());

        raw.token_to = None;
        assert_eq!(
            ActionStep::try_from(&raw),
            Err(StepShapeError::MissingField("token_to"))
        );
    }

    #[test]
    fn mint_requires_positive_minted_amount() {
        let raw = ProposedStep {
            protocol: Some("Quill".into()),
            action: Some("borrow_usdq".into()),
            token: Some("ETH".into()),
            amount: Some(dec!(1)),
            minted_amount: Some(dec!(0)),
            ..Default::default()
        };
        assert_eq!(
            ActionStep::try_from(&raw),
            Err(StepShapeError::NonPositive {
                field: "minted_amount",
                value: dec!(0)
            })
        );
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut raw = swap_proposal();
        raw.amount = Some(dec!(0));
        assert!(matches!(
            ActionStep::try_from(&raw),
            Err(StepShapeError::NonPositive { field: "amount", .. })
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let mut raw = swap_proposal();
        raw.action = Some("yolo".into());
        assert_eq!(
            ActionStep::try_from(&raw),
            Err(StepShapeError::UnknownAction("yolo".into()))
        );
    }

    #[test]
    fn missing_yield_defaults_to_zero() {
        let mut raw = swap_proposal();
        raw.expected_yield = None;
        let step = ActionStep::try_from(&raw).unwrap();
        assert_eq!(step.expected_yield, Decimal::ZERO);
    }

    #[test]
    fn proposed_round_trip_keeps_payload() {
        let raw = ProposedStep {
            protocol: Some("Quill".into()),
            action: Some("mint_against_collateral".into()),
            token: Some("WETH".into()),
            amount: Some(dec!(0.5)),
            expected_yield: Some(dec!(-6)),
            interest_rate: Some(dec!(6)),
            minted_amount: Some(dec!(300)),
            ..Default::default()
        };
        let step = ActionStep::try_from(&raw).unwrap();
        assert_eq!(step.to_proposed(), raw);
    }

    #[test]
    fn pair_sides_are_mapped() {
        let raw = ProposedStep {
            protocol: Some("Ambient".into()),
            action: Some("add_liquidity".into()),
            token: Some("ETH".into()),
            amount: Some(dec!(1)),
            pair: Some("ETH-USDC".into()),
            ..Default::default()
        };
        let step = ActionStep::try_from(&raw).unwrap().map_tokens(|t| {
            if t.as_str() == "ETH" {
                TokenSymbol::from("WETH")
            } else {
                t.clone()
            }
        });
        assert_eq!(step.token, TokenSymbol::from("WETH"));
        assert_eq!(
            step.action,
            Action::AddLiquidity {
                pair: "WETH-USDC".into()
            }
        );
    }

    #[test]
    fn steps_serialize_flat_with_action_tag() {
        let step = ActionStep::try_from(&swap_proposal()).unwrap();
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["action"], "swap");
        assert_eq!(json["token_to"], "ETH");
        assert_eq!(json["amount"], 10.0);
    }
}
