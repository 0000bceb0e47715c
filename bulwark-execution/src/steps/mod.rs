pub mod mint;

use crate::policy::RepairPolicy;
use crate::simulator::SimulationState;
use bulwark_oracles::Reference;
use bulwark_types::{Action, ActionStep, Diagnostic, ShortfallOutcome, TokenSymbol};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Everything a single step repair may read or advance.
pub struct RepairContext<'a> {
    pub state: &'a mut SimulationState,
    pub reference: &'a Reference,
    pub policy: &'a RepairPolicy,
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

impl RepairContext<'_> {
    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        if matches!(diagnostic, Diagnostic::UnpricedToken { .. })
            && self.diagnostics.contains(&diagnostic)
        {
            return;
        }
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn note_unpriced(&mut self, token: &TokenSymbol) {
        if !self.reference.prices().is_priced(token) {
            self.report(Diagnostic::UnpricedToken {
                token: token.clone(),
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Feasible as proposed.
    PassThrough(ActionStep),
    /// Kept with a reduced amount (or clamped mint).
    Shrunk(ActionStep),
    Dropped,
}

impl StepOutcome {
    pub fn into_step(self) -> Option<ActionStep> {
        match self {
            Self::PassThrough(step) | Self::Shrunk(step) => Some(step),
            Self::Dropped => None,
        }
    }
}

/// Checks one well-formed, canonicalized step against the simulated balances
/// and applies its effect if it survives.
pub fn repair_step(index: usize, step: ActionStep, ctx: &mut RepairContext) -> StepOutcome {
    let outcome = match &step.action {
        Action::Deposit | Action::AddLiquidity { .. } => {
            let funding = step.token.clone();
            spend(index, step, &funding, ctx)
        }
        Action::Swap { token_to } => {
            let token_to = token_to.clone();
            let funding = step.token.clone();
            let outcome = spend(index, step, &funding, ctx);
            if let StepOutcome::PassThrough(kept) | StepOutcome::Shrunk(kept) = &outcome {
                quote_swap(index, kept, &token_to, ctx);
            }
            outcome
        }
        Action::Borrow { .. } => {
            ctx.state.produce(&step.token, step.amount);
            ctx.state.record_borrowed(&step.token, step.amount);
            StepOutcome::PassThrough(step)
        }
        Action::MintAgainstCollateral { .. } => mint::repair_mint(index, step, ctx),
        Action::ProvideToPool => {
            let synthetic = ctx.reference.synthetic_token().clone();
            spend(index, step, &synthetic, ctx)
        }
    };

    match &outcome {
        StepOutcome::PassThrough(step) => {
            debug!(index, kind = %step.kind(), token = %step.token, amount = %step.amount, "step passes");
        }
        StepOutcome::Shrunk(step) => {
            debug!(index, kind = %step.kind(), token = %step.token, amount = %step.amount, "step shrunk");
        }
        StepOutcome::Dropped => warn!(index, "step dropped"),
    }
    outcome
}

/// Shared path for every kind that only draws down `funding`: keep the step
/// if it fits, otherwise shrink it to the policy margin of what is left.
fn spend(
    index: usize,
    mut step: ActionStep,
    funding: &TokenSymbol,
    ctx: &mut RepairContext,
) -> StepOutcome {
    let available = ctx.state.available(funding);
    if step.amount <= available {
        ctx.state.consume(funding, step.amount);
        return StepOutcome::PassThrough(step);
    }

    let shrunk = available.saturating_mul(ctx.policy.shrink_margin);
    if shrunk <= Decimal::ZERO {
        ctx.report(Diagnostic::InsufficientBalance {
            index,
            token: funding.clone(),
            requested: step.amount,
            available,
            outcome: ShortfallOutcome::Dropped,
        });
        return StepOutcome::Dropped;
    }

    ctx.report(Diagnostic::InsufficientBalance {
        index,
        token: funding.clone(),
        requested: step.amount,
        available,
        outcome: ShortfallOutcome::Shrunk { to: shrunk },
    });
    step.amount = shrunk;
    ctx.state.consume(funding, shrunk);
    StepOutcome::Shrunk(step)
}

/// Swap output is advisory: it is quoted from reference prices but never
/// credited to the simulated wallet.
fn quote_swap(index: usize, step: &ActionStep, token_to: &TokenSymbol, ctx: &mut RepairContext) {
    let prices = ctx.reference.prices();
    let price_to = prices.price_of(token_to);
    if price_to <= Decimal::ZERO {
        return;
    }
    let Some(estimated_output) = step
        .amount
        .checked_mul(prices.price_of(&step.token))
        .and_then(|value| value.checked_div(price_to))
    else {
        return;
    };
    ctx.report(Diagnostic::SwapQuote {
        index,
        token_to: token_to.clone(),
        estimated_output,
    });
}
