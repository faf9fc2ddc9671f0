//! Account ledger
//!
//! - `account.rs` - Accounts, chains and the copy-on-write [`Ledger`] snapshot
//! - `reconciler.rs` - Pure event → snapshot transitions
//! - `service.rs` - Single-writer owner publishing snapshots to readers
//! - `store.rs` - JSON persistence

mod account;
mod reconciler;
mod service;
mod store;

pub use account::{Account, AddressRecord, Chain, Ledger};
pub use reconciler::{
    apply_account_added, apply_confirmed_balance, apply_confirmed_balance_on,
    apply_full_refresh, apply_hd_path, apply_loading, apply_metadata_update,
    apply_pending_delta, apply_tx_count, reconcile, LedgerEvent, PendingDelta,
};
pub use service::LedgerService;
pub use store::LedgerStore;
