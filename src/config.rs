//! Ledger configuration from environment variables
//!
//! Controls transfer defaults and where the ledger is persisted.
//! Defaults to a plain 21000-gas transfer at zero gas price, in memory only.

use std::env;
use std::path::PathBuf;

use crate::amount::Amount;
use crate::transfer::TransferDefaults;

/// Gas limit of a plain value transfer
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Gas limit for newly created transfers
    pub default_gas_limit: u64,
    /// Gas price (wei) for newly created transfers
    pub default_gas_price: Amount,
    /// Optional ledger file; `None` keeps the ledger in memory
    pub store_path: Option<PathBuf>,
}

impl LedgerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `LEDGER_DEFAULT_GAS_LIMIT`: gas limit for new transfers (default 21000)
    /// - `LEDGER_DEFAULT_GAS_PRICE`: gas price in wei for new transfers (default 0)
    /// - `LEDGER_STORE_PATH`: JSON file to persist the ledger in (optional)
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_gas_limit = match env::var("LEDGER_DEFAULT_GAS_LIMIT") {
            Ok(raw) => raw.trim().parse::<u64>().unwrap_or_else(|e| {
                log::warn!(
                    "Invalid LEDGER_DEFAULT_GAS_LIMIT '{}' ({}), using {}",
                    raw,
                    e,
                    defaults.default_gas_limit
                );
                defaults.default_gas_limit
            }),
            Err(_) => defaults.default_gas_limit,
        };

        let default_gas_price = match env::var("LEDGER_DEFAULT_GAS_PRICE") {
            Ok(raw) => Amount::parse_decimal(raw.trim()).unwrap_or_else(|e| {
                log::warn!(
                    "Invalid LEDGER_DEFAULT_GAS_PRICE '{}' ({}), using {}",
                    raw,
                    e,
                    defaults.default_gas_price
                );
                defaults.default_gas_price
            }),
            Err(_) => defaults.default_gas_price,
        };

        let store_path = env::var("LEDGER_STORE_PATH").ok().map(PathBuf::from);
        match &store_path {
            Some(path) => log::info!("Ledger store: {}", path.display()),
            None => log::info!("Ledger store: in-memory"),
        }

        log::debug!(
            "Transfer defaults: gas limit {}, gas price {} wei",
            default_gas_limit,
            default_gas_price
        );

        Self {
            default_gas_limit,
            default_gas_price,
            store_path,
        }
    }

    pub fn transfer_defaults(&self) -> TransferDefaults {
        TransferDefaults {
            gas_limit: self.default_gas_limit,
            gas_price: self.default_gas_price,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_gas_limit: DEFAULT_GAS_LIMIT,
            default_gas_price: Amount::ZERO,
            store_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_plain_transfer() {
        let config = LedgerConfig::default();
        assert_eq!(config.default_gas_limit, 21_000);
        assert!(config.default_gas_price.is_zero());
        assert!(config.store_path.is_none());
    }

    // the only test that touches LEDGER_* variables
    #[test]
    fn test_from_env() {
        env::set_var("LEDGER_DEFAULT_GAS_LIMIT", " 65000 ");
        env::set_var("LEDGER_DEFAULT_GAS_PRICE", "20000000000");
        env::set_var("LEDGER_STORE_PATH", "/tmp/ledger.json");

        let config = LedgerConfig::from_env();
        assert_eq!(config.default_gas_limit, 65_000);
        assert_eq!(config.default_gas_price, Amount::from(20_000_000_000u64));
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/ledger.json")));

        // invalid values fall back to the defaults
        env::set_var("LEDGER_DEFAULT_GAS_LIMIT", "lots");
        env::set_var("LEDGER_DEFAULT_GAS_PRICE", "1.5");
        env::remove_var("LEDGER_STORE_PATH");

        let config = LedgerConfig::from_env();
        assert_eq!(config.default_gas_limit, DEFAULT_GAS_LIMIT);
        assert!(config.default_gas_price.is_zero());
        assert!(config.store_path.is_none());

        env::remove_var("LEDGER_DEFAULT_GAS_LIMIT");
        env::remove_var("LEDGER_DEFAULT_GAS_PRICE");
    }

    #[test]
    fn test_transfer_defaults() {
        let config = LedgerConfig {
            default_gas_limit: 60_000,
            default_gas_price: Amount::from(20_000_000_000u64),
            ..Default::default()
        };

        let defaults = config.transfer_defaults();
        assert_eq!(defaults.gas_limit, 60_000);
        assert_eq!(defaults.gas_price, Amount::from(20_000_000_000u64));
    }
}
