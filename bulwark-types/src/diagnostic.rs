use crate::token::TokenSymbol;
use rust_decimal::Decimal;
use serde::Serialize;

/// What happened to a step that asked for more than was available.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ShortfallOutcome {
    Shrunk {
        #[serde(with = "rust_decimal::serde::float")]
        to: Decimal,
    },
    Dropped,
}

/// Record of a repair. Every recovery the engine performs shows up here;
/// none of these are failures.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    MalformedStep {
        index: usize,
        reason: String,
    },
    InsufficientBalance {
        index: usize,
        token: TokenSymbol,
        #[serde(with = "rust_decimal::serde::float")]
        requested: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        available: Decimal,
        outcome: ShortfallOutcome,
    },
    MintCapped {
        index: usize,
        #[serde(with = "rust_decimal::serde::float")]
        requested: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        cap: Decimal,
    },
    /// A decision used the default price for this token.
    UnpricedToken {
        token: TokenSymbol,
    },
    /// Advisory only; swap output is never credited to the simulation.
    SwapQuote {
        index: usize,
        token_to: TokenSymbol,
        #[serde(with = "rust_decimal::serde::float")]
        estimated_output: Decimal,
    },
    EmptyPlanAfterRepair {
        fallback_token: TokenSymbol,
    },
    UnknownTier {
        tier_name: String,
    },
    YieldClamped {
        #[serde(with = "rust_decimal::serde::float")]
        raw: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        clamped: Decimal,
    },
}

impl Diagnostic {
    /// Index of the step this diagnostic refers to, if any.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::MalformedStep { index, .. }
            | Self::InsufficientBalance { index, .. }
            | Self::MintCapped { index, .. }
            | Self::SwapQuote { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(
            self,
            Self::MalformedStep { .. }
                | Self::InsufficientBalance {
                    outcome: ShortfallOutcome::Dropped,
                    ..
                }
        )
    }
}
