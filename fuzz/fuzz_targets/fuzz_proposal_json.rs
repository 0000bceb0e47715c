#![no_main]

use libfuzzer_sys::fuzz_target;

use bulwark_execution::PlanValidator;
use bulwark_types::{ProposedPlan, TokenSymbol, WalletBalances};
use rust_decimal::Decimal;

fuzz_target!(|data: &[u8]| {
    // Anything that parses as a plan must come back repaired, never rejected.
    let Ok(proposal) = serde_json::from_slice::<ProposedPlan>(data) else {
        return;
    };
    let wallet: WalletBalances = [
        (TokenSymbol::from("ETH"), Decimal::ONE),
        (TokenSymbol::from("USDC"), Decimal::from(250)),
    ]
    .into_iter()
    .collect();

    let plan = PlanValidator::default().validate(&proposal, &wallet);
    assert!(!plan.steps.is_empty());
    assert!(serde_json::to_vec(&plan).is_ok());
});
