//! Chain Ledger: multi-chain accounts and fee-checked transfers
//!
//! This crate keeps track of accounts across chains and decides, from the balances it
//! knows, whether a transfer can be built and what its numeric fields must be.
//!
//! # Architecture
//!
//! - **Ledger**: one [`Account`] per (chain, address) with confirmed and pending balances
//! - **Reconciler**: pure transitions from a [`Ledger`] snapshot and a [`LedgerEvent`] to
//!   the next snapshot
//! - **Transfer builder**: native and token [`Transfer`]s validated against balance
//!   snapshots, with send-all rebalancing
//! - **Plain form**: lossless string/number record of a transfer ([`TransferPlain`])
//!
//! Signing, broadcasting and network watching live outside this crate; it consumes their
//! events and produces [`SignRequest`]s.
//!
//! # Example
//!
//! ```ignore
//! use chain_ledger::{
//!     reconcile, Amount, BalanceSnapshot, Chain, Ledger, LedgerEvent, PendingDelta, Transfer,
//! };
//!
//! let ledger = reconcile(&Ledger::new(), LedgerEvent::AddAccount {
//!     account_id: "0xabc".into(),
//!     chain: Chain::Eth,
//!     name: Some("main".into()),
//!     description: None,
//! })?;
//! let ledger = reconcile(&ledger, LedgerEvent::SetBalance {
//!     account_id: "0xabc".into(),
//!     chain: Some(Chain::Eth),
//!     value: Amount::from(1_000_000u64),
//! })?;
//!
//! let source = ledger.find_on(Chain::Eth, "0xabc").unwrap();
//! let mut tx = Transfer::native();
//! tx.set_from(&source.id, BalanceSnapshot::native_from(source).unwrap())?;
//! tx.set_to("0xdef");
//! tx.set_amount(Amount::from(1000u64));
//! let request = tx.finalize()?;
//!
//! let ledger = reconcile(&ledger, LedgerEvent::PendingBalance(PendingDelta {
//!     to: None,
//!     from: Some(request.from.clone()),
//!     value: request.amount,
//! }))?;
//! ```

// Public modules
pub mod amount;
pub mod config;
pub mod error;
pub mod ledger;
pub mod transfer;

// Re-exports for convenience
pub use amount::{Amount, Change};
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::{
    apply_account_added, apply_confirmed_balance, apply_confirmed_balance_on,
    apply_full_refresh, apply_hd_path, apply_loading, apply_metadata_update,
    apply_pending_delta, apply_tx_count, reconcile, Account, AddressRecord, Chain, Ledger,
    LedgerEvent, LedgerService, LedgerStore, PendingDelta,
};
pub use transfer::{
    AssetKind, BalanceSnapshot, SignRequest, Transfer, TransferAsset, TransferDefaults,
    TransferPlain, TransferType, TxTarget, ValidationResult,
};

// Common result type
pub type Result<T> = std::result::Result<T, LedgerError>;
