//! Plan validation and repair.
//!
//! A [`PlanValidator`] walks an untrusted plan left to right against a
//! simulated copy of the wallet, shrinking or dropping steps that claim more
//! than exists, and recomputes a tier-bounded aggregate yield. It never
//! fails: the worst case is a single conservative fallback deposit.

pub mod policy;
pub mod simulator;
pub mod steps;

pub use policy::{RepairPolicy, YieldBand};
pub use simulator::{SimulationState, TokenFlow};
pub use steps::{repair_step, RepairContext, StepOutcome};

use bulwark_oracles::Reference;
use bulwark_types::{
    Action, ActionStep, Diagnostic, Plan, ProposedPlan, Tier, TokenSymbol, WalletBalances,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

const FALLBACK_EXPLANATION: &str = "None of the proposed steps could be executed with the \
current wallet balances, so the plan falls back to a conservative single-asset deposit of";

/// Output of one validation pass.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Repair {
    pub plan: Plan,
    pub diagnostics: Vec<Diagnostic>,
    pub ledger: BTreeMap<TokenSymbol, TokenFlow>,
}

impl Repair {
    pub fn dropped_steps(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_drop()).count()
    }

    pub fn used_fallback(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::EmptyPlanAfterRepair { .. }))
    }
}

/// Stateless between calls; share one instance across threads.
#[derive(Debug, Clone)]
pub struct PlanValidator {
    reference: Arc<Reference>,
    policy: RepairPolicy,
}

impl Default for PlanValidator {
    fn default() -> Self {
        Self::new(Arc::new(Reference::default()))
    }
}

impl PlanValidator {
    pub fn new(reference: Arc<Reference>) -> Self {
        Self {
            reference,
            policy: RepairPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RepairPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn policy(&self) -> &RepairPolicy {
        &self.policy
    }

    pub fn validate(&self, proposal: &ProposedPlan, wallet: &WalletBalances) -> Plan {
        self.validate_with_report(proposal, wallet).plan
    }

    pub fn validate_with_report(&self, proposal: &ProposedPlan, wallet: &WalletBalances) -> Repair {
        let wallet = self.canonical_wallet(wallet);
        let mut state = SimulationState::new(&wallet, self.reference.synthetic_token());
        let mut diagnostics = Vec::new();
        let mut valid_steps = Vec::with_capacity(proposal.steps.len());

        for (index, proposed) in proposal.steps.iter().enumerate() {
            let step = match ActionStep::try_from(proposed) {
                Ok(step) => step.map_tokens(|token| self.reference.canonicalize(token)),
                Err(reason) => {
                    warn!(index, %reason, "dropping malformed step");
                    diagnostics.push(Diagnostic::MalformedStep {
                        index,
                        reason: reason.to_string(),
                    });
                    continue;
                }
            };

            let mut ctx = RepairContext {
                state: &mut state,
                reference: &self.reference,
                policy: &self.policy,
                diagnostics: &mut diagnostics,
            };
            if let Some(step) = repair_step(index, step, &mut ctx).into_step() {
                valid_steps.push(step);
            }
        }

        let mut explanation = proposal.explanation.clone();
        let mut risk_factors = proposal.risk_factors.clone();
        if valid_steps.is_empty() {
            let step = self.fallback_step(&state, &mut diagnostics);
            let display = self.reference.aliases().display(&step.token);
            warn!(token = %step.token, amount = %step.amount, "no feasible steps, using fallback deposit");
            explanation = format!("{FALLBACK_EXPLANATION} {display}.");
            risk_factors = vec![
                format!("Single-asset exposure to {display}"),
                format!("{} smart contract risk", step.protocol),
            ];
            valid_steps.push(step);
        }

        let aggregate_yield = self.aggregate_yield(&proposal.tier_name, &valid_steps, &mut diagnostics);

        info!(
            "Validated '{}' plan: {} of {} steps kept, aggregate yield {}",
            proposal.tier_name,
            valid_steps.len(),
            proposal.steps.len(),
            aggregate_yield
        );

        Repair {
            plan: Plan {
                tier_name: proposal.tier_name.clone(),
                risk_level: proposal.risk_level,
                steps: valid_steps,
                explanation,
                aggregate_yield,
                risk_factors,
            },
            diagnostics,
            ledger: state.ledger(),
        }
    }

    /// Validates independent plans (typically the tier triple for one
    /// wallet) in parallel. Output order matches input order.
    pub fn validate_all(&self, proposals: &[ProposedPlan], wallet: &WalletBalances) -> Vec<Plan> {
        proposals
            .par_iter()
            .map(|proposal| self.validate(proposal, wallet))
            .collect()
    }

    pub fn validate_all_with_report(
        &self,
        proposals: &[ProposedPlan],
        wallet: &WalletBalances,
    ) -> Vec<Repair> {
        proposals
            .par_iter()
            .map(|proposal| self.validate_with_report(proposal, wallet))
            .collect()
    }

    /// Resolves aliases on wallet keys. When several keys land on the same
    /// canonical symbol the larger amount wins; mirrored entries such as
    /// ETH/WETH describe one holding and must not be summed.
    fn canonical_wallet(&self, wallet: &WalletBalances) -> WalletBalances {
        let mut canonical = WalletBalances::new();
        for (token, amount) in wallet {
            let entry = canonical
                .entry(self.reference.canonicalize(token))
                .or_insert(*amount);
            *entry = (*entry).max(*amount);
        }
        canonical
    }

    fn fallback_step(&self, state: &SimulationState, diagnostics: &mut Vec<Diagnostic>) -> ActionStep {
        let prices = self.reference.prices();
        let (token, amount) = match state.richest(prices) {
            Some((token, _)) => {
                let amount = state
                    .available(&token)
                    .saturating_mul(self.policy.fallback_fraction);
                (token, amount)
            }
            // Only place a non-positive amount enters a plan.
            None => (self.reference.fallback_asset().clone(), Decimal::ZERO),
        };

        if !prices.is_priced(&token) {
            diagnostics.push(Diagnostic::UnpricedToken {
                token: token.clone(),
            });
        }
        diagnostics.push(Diagnostic::EmptyPlanAfterRepair {
            fallback_token: token.clone(),
        });

        ActionStep {
            protocol: self.policy.fallback_protocol.clone(),
            action: Action::Deposit,
            token,
            amount,
            expected_yield: self.policy.fallback_yield,
        }
    }

    /// Mean absolute step yield, floored, then clamped into the tier band.
    /// Borrowing costs are negative by convention and count by magnitude.
    fn aggregate_yield(
        &self,
        tier_name: &str,
        steps: &[ActionStep],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Decimal {
        let mean = if steps.is_empty() {
            Decimal::ZERO
        } else {
            let total = steps
                .iter()
                .map(|step| step.expected_yield.abs())
                .fold(Decimal::ZERO, Decimal::saturating_add);
            total / Decimal::from(steps.len())
        };
        let raw = mean.max(self.policy.yield_floor);

        let Some(tier) = Tier::from_name(tier_name) else {
            diagnostics.push(Diagnostic::UnknownTier {
                tier_name: tier_name.to_string(),
            });
            return raw;
        };

        let clamped = self.policy.band(tier).clamp(raw);
        if clamped != raw {
            diagnostics.push(Diagnostic::YieldClamped { raw, clamped });
        }
        clamped
    }
}
