use anyhow::{bail, Context, Result};
use bulwark_execution::{PlanValidator, Repair};
use bulwark_types::{Diagnostic, ProposedPlan, ProposedStep, ShortfallOutcome, Tier, TokenSymbol, WalletBalances};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bulwark randomized repair simulation")]
struct Args {
    /// Number of hostile plans to generate and validate.
    #[arg(long, default_value_t = 2_000)]
    plans: usize,
    /// Seed for the plan generator; the same seed replays the same run.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Log every repair decision.
    #[arg(short, long)]
    verbose: bool,
}

const TOKENS: &[&str] = &[
    "ETH", "WETH", "USDC", "SCR", "SRC", "wstETH", "weETH", "USDQ", "DOGE", "",
];

const ACTIONS: &[&str] = &[
    "deposit",
    "supply",
    "borrow",
    "swap",
    "add_liquidity",
    "borrow_usdq",
    "mint_against_collateral",
    "deposit_stability_pool",
    "stake",
    "",
];

const TIERS: &[&str] = &["Anchor", "Zenith", "Wildcard", "conservative", "balanced", "aggressive", "moonshot"];

const PROTOCOLS: &[&str] = &["AAVE", "Ambient", "Quill", "Nuri"];

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

/// Amount with two decimal places in `[0, max)`.
fn amount(rng: &mut StdRng, max: i64) -> Decimal {
    Decimal::new(rng.gen_range(0..max.max(1) * 100), 2)
}

fn build_wallet(rng: &mut StdRng) -> WalletBalances {
    let holdings = rng.gen_range(0..5);
    (0..holdings)
        .map(|_| {
            let token = TokenSymbol::from(pick(rng, TOKENS));
            // the odd negative balance exercises the clamp
            let value = if rng.gen_bool(0.05) {
                -amount(rng, 100)
            } else {
                amount(rng, 5_000)
            };
            (token, value)
        })
        .filter(|(token, _)| !token.is_empty())
        .collect()
}

fn maybe<T>(rng: &mut StdRng, keep: f64, value: T) -> Option<T> {
    rng.gen_bool(keep).then_some(value)
}

fn build_step(rng: &mut StdRng) -> ProposedStep {
    let yield_sign = if rng.gen_bool(0.2) { Decimal::NEGATIVE_ONE } else { Decimal::ONE };
    let protocol = pick(rng, PROTOCOLS).to_string();
    let action = pick(rng, ACTIONS).to_string();
    let token = TokenSymbol::from(pick(rng, TOKENS));
    let size = amount(rng, 10_000);
    let expected_yield = amount(rng, 40) * yield_sign;
    let token_to = TokenSymbol::from(pick(rng, TOKENS));
    let pair = format!("{}-{}", pick(rng, TOKENS), pick(rng, TOKENS));
    let interest_rate = amount(rng, 10);
    let minted_amount = amount(rng, 50_000);

    ProposedStep {
        protocol: maybe(rng, 0.95, protocol),
        action: maybe(rng, 0.95, action),
        token: maybe(rng, 0.95, token),
        amount: maybe(rng, 0.95, size),
        expected_yield: maybe(rng, 0.9, expected_yield),
        token_to: maybe(rng, 0.7, token_to),
        pair: maybe(rng, 0.7, pair),
        interest_rate: maybe(rng, 0.5, interest_rate),
        minted_amount: maybe(rng, 0.8, minted_amount),
    }
}

fn build_plan(rng: &mut StdRng) -> ProposedPlan {
    let step_count = rng.gen_range(0..8);
    ProposedPlan {
        tier_name: pick(rng, TIERS).to_string(),
        risk_level: rng.gen_range(1..=10),
        steps: (0..step_count).map(|_| build_step(rng)).collect(),
        explanation: "Simulated strategy".to_string(),
        aggregate_yield: Some(amount(rng, 100)),
        risk_factors: vec!["Simulated risk".to_string()],
    }
}

#[derive(Debug, Default)]
struct Tally {
    steps_in: usize,
    steps_out: usize,
    malformed: usize,
    shrunk: usize,
    dropped_short: usize,
    mint_capped: usize,
    fallbacks: usize,
}

impl Tally {
    fn record(&mut self, proposal: &ProposedPlan, repair: &Repair) {
        self.steps_in += proposal.steps.len();
        self.steps_out += repair.plan.steps.len();
        for diagnostic in &repair.diagnostics {
            match diagnostic {
                Diagnostic::MalformedStep { .. } => self.malformed += 1,
                Diagnostic::InsufficientBalance { outcome, .. } => match outcome {
                    ShortfallOutcome::Shrunk { .. } => self.shrunk += 1,
                    ShortfallOutcome::Dropped => self.dropped_short += 1,
                },
                Diagnostic::MintCapped { .. } => self.mint_capped += 1,
                Diagnostic::EmptyPlanAfterRepair { .. } => self.fallbacks += 1,
                _ => {}
            }
        }
    }
}

/// Checks every guarantee the validator makes about one repaired plan.
fn check_invariants(
    validator: &PlanValidator,
    proposal: &ProposedPlan,
    wallet: &WalletBalances,
    repair: &Repair,
) -> Result<()> {
    let plan = &repair.plan;
    if plan.steps.is_empty() {
        bail!("'{}' plan came back empty", proposal.tier_name);
    }

    for (token, flow) in &repair.ledger {
        if flow.closing() < Decimal::ZERO {
            bail!("{token} closes negative: {flow:?}");
        }
    }

    if let Some(tier) = Tier::from_name(&plan.tier_name) {
        let band = validator.policy().band(tier);
        if plan.aggregate_yield < band.min || plan.aggregate_yield > band.max {
            bail!(
                "{} yield {} outside [{}, {}]",
                tier.as_str(),
                plan.aggregate_yield,
                band.min,
                band.max
            );
        }
    }

    let replay = validator.validate(&plan.to_proposal(), wallet);
    if &replay != plan {
        bail!("revalidation changed the plan: {plan:?} -> {replay:?}");
    }
    Ok(())
}

fn run_simulation(args: &Args) -> Result<Tally> {
    let validator = PlanValidator::default();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut tally = Tally::default();

    for round in 0..args.plans {
        let wallet = build_wallet(&mut rng);
        let proposal = build_plan(&mut rng);
        let repair = validator.validate_with_report(&proposal, &wallet);
        check_invariants(&validator, &proposal, &wallet, &repair)
            .with_context(|| format!("invariant violated in round {round} (seed {})", args.seed))?;
        tally.record(&proposal, &repair);
    }
    Ok(tally)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::ERROR };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Running {} plans with seed {}", args.plans, args.seed);
    let start = Instant::now();
    let tally = run_simulation(&args)?;
    let elapsed = start.elapsed();

    println!("=== Bulwark Simulation ===");
    println!("Plans validated: {}", args.plans);
    println!("Seed: {}", args.seed);
    println!("Steps proposed: {}", tally.steps_in);
    println!("Steps kept: {}", tally.steps_out);
    println!("Malformed steps dropped: {}", tally.malformed);
    println!("Steps shrunk: {}", tally.shrunk);
    println!("Steps dropped for balance: {}", tally.dropped_short);
    println!("Mints capped: {}", tally.mint_capped);
    println!("Fallback plans: {}", tally.fallbacks);
    println!("Elapsed: {:.2?}", elapsed);
    println!("All invariants held.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(plans: usize, seed: u64) -> Args {
        Args {
            plans,
            seed,
            verbose: false,
        }
    }

    #[test]
    fn short_run_holds_all_invariants() {
        let tally = run_simulation(&args(300, 42)).unwrap();
        assert!(tally.steps_out >= 300);
        assert!(tally.fallbacks > 0);
    }

    #[test]
    fn same_seed_replays_same_plans() {
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            assert_eq!(build_plan(&mut a), build_plan(&mut b));
            assert_eq!(build_wallet(&mut a), build_wallet(&mut b));
        }
    }

    #[test]
    fn empty_symbols_never_reach_the_wallet() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            assert!(build_wallet(&mut rng).keys().all(|token| !token.is_empty()));
        }
    }
}
