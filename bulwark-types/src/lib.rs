pub mod action;
pub mod diagnostic;
pub mod plan;
pub mod proposal;
pub mod token;

pub use action::{Action, ActionKind, ActionStep, StepShapeError};
pub use diagnostic::{Diagnostic, ShortfallOutcome};
pub use plan::{Plan, Tier};
pub use proposal::{ProposedPlan, ProposedStep};
pub use token::{TokenSymbol, WalletBalances};
