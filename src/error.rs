//! Error types for ledger and transfer operations
//!
//! Validation outcomes of a transfer are plain values ([`ValidationResult`]) and never
//! show up here. This type covers contract violations (unknown accounts, unknown
//! balances), malformed plain-form input and persistence failures.

use thiserror::Error;

use crate::transfer::{AssetKind, ValidationResult};

/// Core error type for ledger reconciliation and transfer building
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Operation addressed an account the ledger does not hold
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Pending delta requested on an account whose confirmed balance was never fetched
    #[error("Confirmed balance unknown for account {0}")]
    BalanceUnknown(String),

    #[error("Amount overflow: {0}")]
    Overflow(String),

    #[error("Amount underflow: {0}")]
    Underflow(String),

    /// Balance snapshot kind does not match the transfer kind
    #[error("Asset mismatch: transfer is {expected:?}, snapshot is {actual:?}")]
    AssetMismatch { expected: AssetKind, actual: AssetKind },

    /// Transfer did not pass validation
    #[error("Transfer is not valid: {0}")]
    Invalid(ValidationResult),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid plain transfer: {0}")]
    InvalidPlain(String),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn account_not_found(id: impl Into<String>) -> Self {
        Self::AccountNotFound(id.into())
    }

    pub fn invalid_plain(msg: impl Into<String>) -> Self {
        Self::InvalidPlain(msg.into())
    }
}
