use super::{RepairContext, StepOutcome};
use bulwark_types::{Action, ActionStep, Diagnostic, ShortfallOutcome, TokenSymbol};
use rust_decimal::Decimal;
use tracing::debug;

/// Locks `step.amount` of the step token as collateral and mints the
/// synthetic token. Short collateral drops the step outright; an oversized
/// mint is clamped to the collateral-value cap.
pub fn repair_mint(index: usize, mut step: ActionStep, ctx: &mut RepairContext) -> StepOutcome {
    let collateral = step.token.clone();
    let synthetic = ctx.reference.synthetic_token().clone();

    let available = ctx.state.available(&collateral);
    if step.amount > available {
        ctx.report(Diagnostic::InsufficientBalance {
            index,
            token: collateral,
            requested: step.amount,
            available,
            outcome: ShortfallOutcome::Dropped,
        });
        return StepOutcome::Dropped;
    }

    // The cap is measured on holdings before this step's collateral is locked.
    let held: Vec<TokenSymbol> = ctx
        .state
        .holdings()
        .filter(|(token, _)| *token != &synthetic)
        .map(|(token, _)| token.clone())
        .collect();
    for token in &held {
        ctx.note_unpriced(token);
    }
    let collateral_value = ctx
        .state
        .collateral_value(ctx.reference.prices(), &synthetic);
    let cap = ctx.policy.mint_cap(collateral_value);

    let mut clamped = false;
    let minted = match &mut step.action {
        Action::MintAgainstCollateral { minted_amount, .. } => {
            if *minted_amount > cap {
                ctx.report(Diagnostic::MintCapped {
                    index,
                    requested: *minted_amount,
                    cap,
                });
                *minted_amount = cap;
                clamped = true;
            }
            *minted_amount
        }
        _ => Decimal::ZERO,
    };

    ctx.state.consume(&collateral, step.amount);
    if minted > Decimal::ZERO {
        ctx.state.produce(&synthetic, minted);
        ctx.state.record_borrowed(&synthetic, minted);
    }
    debug!(index, %collateral_value, %cap, %minted, "minted {synthetic} against {collateral}");

    if clamped {
        StepOutcome::Shrunk(step)
    } else {
        StepOutcome::PassThrough(step)
    }
}
