#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use bulwark_execution::PlanValidator;
use bulwark_types::{Action, ProposedPlan, ProposedStep, WalletBalances};
use rust_decimal::Decimal;

#[derive(Arbitrary, Debug)]
struct MintInput {
    weth: u32,
    usdc: u32,
    collateral: u32,
    minted: u64,
}

fuzz_target!(|data: MintInput| {
    let wallet: WalletBalances = [
        ("ETH".into(), Decimal::new(data.weth as i64, 3)),
        ("USDC".into(), Decimal::new(data.usdc as i64, 2)),
    ]
    .into_iter()
    .collect();
    let proposal = ProposedPlan {
        tier_name: "Wildcard".into(),
        steps: vec![ProposedStep {
            protocol: Some("Quill".into()),
            action: Some("borrow_usdq".into()),
            token: Some("ETH".into()),
            amount: Some(Decimal::new(data.collateral as i64 + 1, 3)),
            minted_amount: Some(Decimal::new((data.minted % 1_000_000_000) as i64 + 1, 2)),
            ..Default::default()
        }],
        ..Default::default()
    };

    let validator = PlanValidator::default();
    let plan = validator.validate(&proposal, &wallet);
    for step in &plan.steps {
        if let Action::MintAgainstCollateral { minted_amount, .. } = step.action {
            let held = Decimal::new(data.weth as i64, 3) * Decimal::from(2000)
                + Decimal::new(data.usdc as i64, 2);
            assert!(minted_amount <= validator.policy().mint_cap(held));
        }
    }
});
