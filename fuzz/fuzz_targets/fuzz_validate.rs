#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use bulwark_execution::PlanValidator;
use bulwark_types::{ProposedPlan, ProposedStep, TokenSymbol, WalletBalances};
use rust_decimal::Decimal;

const TOKENS: &[&str] = &["ETH", "WETH", "USDC", "SCR", "SRC", "USDQ", "wstETH", "XYZ"];
const ACTIONS: &[&str] = &[
    "deposit",
    "borrow",
    "swap",
    "add_liquidity",
    "borrow_usdq",
    "deposit_stability_pool",
    "unknown",
];
const TIERS: &[&str] = &["Anchor", "Zenith", "Wildcard", "unlisted"];

#[derive(Arbitrary, Debug)]
struct StepInput {
    action: u8,
    token: u8,
    token_to: u8,
    amount: i64,
    minted: i64,
    expected_yield: i32,
    drop_field: u8,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    tier: u8,
    balances: Vec<(u8, i64)>,
    steps: Vec<StepInput>,
}

fn token(index: u8) -> TokenSymbol {
    TOKENS[index as usize % TOKENS.len()].into()
}

fn step_from(input: &StepInput) -> ProposedStep {
    let mut step = ProposedStep {
        protocol: Some("AAVE".into()),
        action: Some(ACTIONS[input.action as usize % ACTIONS.len()].into()),
        token: Some(token(input.token)),
        amount: Some(Decimal::new(input.amount, 4)),
        expected_yield: Some(Decimal::new(input.expected_yield as i64, 2)),
        token_to: Some(token(input.token_to)),
        pair: Some(format!("{}-{}", token(input.token), token(input.token_to))),
        interest_rate: None,
        minted_amount: Some(Decimal::new(input.minted, 2)),
    };
    match input.drop_field % 8 {
        0 => step.action = None,
        1 => step.token = None,
        2 => step.amount = None,
        3 => step.token_to = None,
        _ => {}
    }
    step
}

fuzz_target!(|data: FuzzInput| {
    let wallet: WalletBalances = data
        .balances
        .iter()
        .map(|(index, amount)| (token(*index), Decimal::new(*amount, 4)))
        .collect();
    let proposal = ProposedPlan {
        tier_name: TIERS[data.tier as usize % TIERS.len()].into(),
        steps: data.steps.iter().map(step_from).collect(),
        ..Default::default()
    };

    let validator = PlanValidator::default();
    let repair = validator.validate_with_report(&proposal, &wallet);

    assert!(!repair.plan.steps.is_empty());
    for flow in repair.ledger.values() {
        assert!(flow.closing() >= Decimal::ZERO);
    }
    assert_eq!(validator.validate(&repair.plan.to_proposal(), &wallet), repair.plan);
});
