mod input;

use anyhow::{Context, Result};
use bulwark_execution::{PlanValidator, Repair};
use bulwark_oracles::Reference;
use clap::{Parser, Subcommand};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Bulwark: validate and repair generated DeFi plans against wallet balances"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Alias and price tables (JSON). Built-in tables when omitted.
    #[arg(long, global = true)]
    reference: Option<PathBuf>,
    /// Repair margins and tier bands (JSON). Built-in policy when omitted.
    #[arg(long, global = true)]
    policy: Option<PathBuf>,
    /// Log every step decision.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a single plan against a wallet
    Validate {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long)]
        wallet: PathBuf,
        /// Print diagnostics, token ledger and fingerprint with the plan
        #[arg(long)]
        report: bool,
    },
    /// Validate a batch of plans (one per tier) against one wallet
    ValidateAll {
        #[arg(long)]
        plans: PathBuf,
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        report: bool,
    },
    /// Show the alias and price tables in effect
    Reference,
}

#[derive(Serialize)]
struct Report<'a> {
    fingerprint: String,
    #[serde(flatten)]
    repair: &'a Repair,
}

impl<'a> Report<'a> {
    fn new(repair: &'a Repair) -> Self {
        Self {
            fingerprint: hex::encode(repair.plan.fingerprint()),
            repair,
        }
    }
}

#[derive(Serialize)]
struct ReferenceView {
    synthetic_token: String,
    fallback_asset: String,
    aliases: BTreeMap<String, String>,
    prices: BTreeMap<String, f64>,
    default_price: f64,
}

impl From<&Reference> for ReferenceView {
    fn from(reference: &Reference) -> Self {
        Self {
            synthetic_token: reference.synthetic_token().to_string(),
            fallback_asset: reference.fallback_asset().to_string(),
            aliases: reference
                .aliases()
                .pairs()
                .map(|(canonical, display)| (display.to_string(), canonical.to_string()))
                .collect(),
            prices: reference
                .prices()
                .iter()
                .map(|(token, price)| (token.to_string(), price.to_f64().unwrap_or_default()))
                .collect(),
            default_price: reference.prices().default_price().to_f64().unwrap_or_default(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let reference = input::load_reference(cli.reference.as_deref())?;
    let policy = input::load_policy(cli.policy.as_deref())?;

    match &cli.command {
        Commands::Validate {
            plan,
            wallet,
            report,
        } => {
            let proposal = input::read_plan(plan)?;
            let wallet = input::read_wallet(wallet)?;
            info!("Loaded '{}' plan with {} steps", proposal.tier_name, proposal.steps.len());

            let validator = PlanValidator::new(Arc::new(reference)).with_policy(policy);
            let repair = validator.validate_with_report(&proposal, &wallet);
            if *report {
                print_json(&Report::new(&repair))?;
            } else {
                print_json(&repair.plan)?;
            }
        }
        Commands::ValidateAll {
            plans,
            wallet,
            report,
        } => {
            let proposals = input::read_batch(plans)?;
            let wallet = input::read_wallet(wallet)?;
            info!("Loaded {} plans", proposals.len());

            let validator = PlanValidator::new(Arc::new(reference)).with_policy(policy);
            let repairs = validator.validate_all_with_report(&proposals, &wallet);
            if *report {
                let reports: Vec<Report> = repairs.iter().map(Report::new).collect();
                print_json(&reports)?;
            } else {
                let plans: Vec<_> = repairs.iter().map(|repair| &repair.plan).collect();
                print_json(&plans)?;
            }
        }
        Commands::Reference => {
            print_json(&ReferenceView::from(&reference))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_types::{ProposedPlan, ProposedStep, TokenSymbol, WalletBalances};
    use rust_decimal_macros::dec;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bulwark",
            "validate",
            "--plan",
            "plan.json",
            "--wallet",
            "wallet.json",
            "--report",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(cli.reference.is_none());
        match cli.command {
            Commands::Validate { plan, report, .. } => {
                assert_eq!(plan, PathBuf::from("plan.json"));
                assert!(report);
            }
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn report_carries_fingerprint_next_to_plan() {
        let validator = PlanValidator::default();
        let proposal = ProposedPlan {
            tier_name: "Anchor".into(),
            steps: vec![ProposedStep {
                protocol: Some("AAVE".into()),
                action: Some("supply".into()),
                token: Some("USDC".into()),
                amount: Some(dec!(500)),
                expected_yield: Some(dec!(3.8)),
                ..Default::default()
            }],
            ..Default::default()
        };
        let wallet: WalletBalances = [(TokenSymbol::from("USDC"), dec!(100))].into_iter().collect();
        let repair = validator.validate_with_report(&proposal, &wallet);

        let json = serde_json::to_value(Report::new(&repair)).unwrap();
        assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);
        assert_eq!(json["plan"]["steps"][0]["amount"], 95.0);
        assert_eq!(json["diagnostics"][0]["kind"], "insufficient_balance");
    }

    #[test]
    fn reference_view_lists_display_aliases() {
        let view = ReferenceView::from(&Reference::default());
        assert_eq!(view.aliases.get("ETH").map(String::as_str), Some("WETH"));
        assert_eq!(view.synthetic_token, "USDQ");
        assert_eq!(view.prices.get("WETH"), Some(&2000.0));
    }
}
