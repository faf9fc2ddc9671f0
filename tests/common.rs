//! Shared fixtures for ledger and transfer integration tests

#![allow(dead_code)]

use chain_ledger::{
    apply_confirmed_balance_on, apply_full_refresh, AddressRecord, Amount, Chain, Ledger,
};
use std::path::PathBuf;

/// Initialize logging and pick up optional `.env` overrides
pub fn init_test_env() {
    // Initialize logger (only once, subsequent calls are no-ops)
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();

    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push(".env");
    dotenv::from_path(&path).ok();
}

/// Refresh row with a name
pub fn record(address: &str, chain: Chain, name: &str) -> AddressRecord {
    AddressRecord {
        name: Some(name.to_string()),
        ..AddressRecord::new(address, chain)
    }
}

pub fn amount(value: u64) -> Amount {
    Amount::from(value)
}

/// Ledger refreshed with `(address, chain, confirmed balance)` entries
pub fn funded_ledger(entries: &[(&str, Chain, u64)]) -> Ledger {
    let records: Vec<AddressRecord> = entries
        .iter()
        .map(|(address, chain, _)| record(address, *chain, address))
        .collect();

    let mut ledger = apply_full_refresh(&Ledger::new(), &records, None);
    for (address, chain, balance) in entries {
        ledger = apply_confirmed_balance_on(&ledger, *chain, address, amount(*balance));
    }
    ledger
}
