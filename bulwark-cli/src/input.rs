use anyhow::{anyhow, Context, Result};
use bulwark_execution::RepairPolicy;
use bulwark_oracles::Reference;
use bulwark_types::proposal::loose;
use bulwark_types::{ProposedPlan, TokenSymbol, WalletBalances};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A wallet file is either a bare `{token: amount}` map or the balance
/// service envelope `{ "balances": {...} }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WalletFile {
    Wrapped { balances: BTreeMap<TokenSymbol, Value> },
    Flat(BTreeMap<TokenSymbol, Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Wrapped { strategies: Vec<ProposedPlan> },
    List(Vec<ProposedPlan>),
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn parse_wallet(raw: &str) -> Result<WalletBalances> {
    let file: WalletFile = serde_json::from_str(raw).context("Wallet is not valid JSON")?;
    let entries = match file {
        WalletFile::Wrapped { balances } => balances,
        WalletFile::Flat(balances) => balances,
    };

    let mut wallet = WalletBalances::new();
    for (token, value) in entries {
        if token.is_empty() {
            continue;
        }
        let amount = loose::parse_value(&value)
            .ok_or_else(|| anyhow!("Balance for {token} is not a number: {value}"))?;
        wallet.insert(token, amount);
    }
    Ok(wallet)
}

pub fn read_wallet(path: &Path) -> Result<WalletBalances> {
    parse_wallet(&read(path)?).with_context(|| format!("Invalid wallet file {}", path.display()))
}

pub fn read_plan(path: &Path) -> Result<ProposedPlan> {
    serde_json::from_str(&read(path)?).with_context(|| format!("Invalid plan file {}", path.display()))
}

pub fn parse_batch(raw: &str) -> Result<Vec<ProposedPlan>> {
    let batch: BatchFile = serde_json::from_str(raw).context("Expected a plan array or {\"strategies\": [...]}")?;
    Ok(match batch {
        BatchFile::Wrapped { strategies } => strategies,
        BatchFile::List(plans) => plans,
    })
}

pub fn read_batch(path: &Path) -> Result<Vec<ProposedPlan>> {
    parse_batch(&read(path)?).with_context(|| format!("Invalid plan batch {}", path.display()))
}

/// Built-in tables unless a file is given.
pub fn load_reference(path: Option<&Path>) -> Result<Reference> {
    match path {
        Some(path) => Reference::load(path)
            .with_context(|| format!("Failed to load reference tables from {}", path.display())),
        None => Ok(Reference::default()),
    }
}

pub fn load_policy(path: Option<&Path>) -> Result<RepairPolicy> {
    match path {
        Some(path) => RepairPolicy::from_json_str(&read(path)?)
            .with_context(|| format!("Invalid repair policy {}", path.display())),
        None => Ok(RepairPolicy::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flat_and_wrapped_wallets_agree() {
        let flat = parse_wallet(r#"{"ETH": 1.5, "USDC": "1,250.75"}"#).unwrap();
        let wrapped = parse_wallet(r#"{"balances": {"ETH": "1.5", "USDC": 1250.75}}"#).unwrap();

        assert_eq!(flat, wrapped);
        assert_eq!(flat[&TokenSymbol::from("USDC")], dec!(1250.75));
    }

    #[test]
    fn garbage_balance_is_an_error() {
        let err = parse_wallet(r#"{"ETH": "lots"}"#).unwrap_err();
        assert!(err.to_string().contains("ETH"));
    }

    #[test]
    fn batch_accepts_array_or_envelope() {
        let list = parse_batch(r#"[{"tier_name": "Anchor"}, {"name": "Zenith"}]"#).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].tier_name, "Zenith");

        let wrapped = parse_batch(r#"{"strategies": [{"tier_name": "Wildcard", "steps": []}]}"#).unwrap();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].tier_name, "Wildcard");
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let reference = load_reference(None).unwrap();
        assert_eq!(reference.synthetic_token(), &TokenSymbol::from("USDQ"));
        assert_eq!(load_policy(None).unwrap(), RepairPolicy::default());
    }
}
