//! Transfer builder
//!
//! A [`Transfer`] captures the intent of one outgoing transfer (source, recipient,
//! amount, gas) before it is signed. It is edited through setters, checked with
//! [`Transfer::validate`], and handed to the signer as a [`SignRequest`] or stored in
//! its [plain form](TransferPlain).
//!
//! # Fee model
//!
//! `amount` never includes fees. Fees are `gas_limit × gas_price`, paid in the native
//! coin:
//!
//! - **Native** transfers draw amount and fee from one balance, so the fee must fit in
//!   what is left after the amount.
//! - **Token** transfers draw the amount from the token balance and the fee from the
//!   native balance; the two are checked independently.
//!
//! Balances are snapshots copied in by [`Transfer::set_from`]. They do not follow the
//! ledger; call `set_from` again after the ledger changes.
//!
//! # Example
//!
//! ```ignore
//! use chain_ledger::{Amount, BalanceSnapshot, Transfer, TxTarget, ValidationResult};
//!
//! let mut tx = Transfer::token("0xdac17f958d2ee523a2206206994597c13d831ec7");
//! tx.set_from("0xsender", BalanceSnapshot::Token {
//!     token: Amount::from(250u64),
//!     ether: Amount::from(1_000_000u64),
//! })?;
//! tx.set_to("0xrecipient");
//! tx.set_target(TxTarget::SendAll);
//! assert!(tx.rebalance());
//! assert_eq!(tx.validate(), ValidationResult::Ok);
//! ```

mod plain;
mod request;

pub use plain::TransferPlain;
pub use request::SignRequest;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::{Amount, Change};
use crate::config::DEFAULT_GAS_LIMIT;
use crate::error::LedgerError;
use crate::ledger::Account;
use crate::Result;

// ============================================================================
// Enumerations
// ============================================================================

/// Outcome of [`Transfer::validate`], in check order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationResult {
    Ok,
    /// No source account, or its balance snapshot is missing
    NoFrom,
    NoTo,
    /// Fee (or, for native transfers, amount plus fee) exceeds the native balance
    InsufficientFunds,
    /// Token amount exceeds the token balance
    InsufficientTokenFunds,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Ok => "ok",
            Self::NoFrom => "no source account selected",
            Self::NoTo => "no recipient selected",
            Self::InsufficientFunds => "insufficient funds",
            Self::InsufficientTokenFunds => "insufficient token funds",
        };
        f.write_str(msg)
    }
}

/// How `amount` is chosen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxTarget {
    /// User-entered amount
    #[default]
    Manual = 0,
    /// Everything the source can send, computed by [`Transfer::rebalance`]
    SendAll = 1,
}

/// Token transfer flavour: direct transfer or spending an allowance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum TransferType {
    #[default]
    Standard = 0,
    Delegate = 1,
}

/// Serialized as its ordinal, like every enum crossing the signer boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum AssetKind {
    Native = 0,
    Token = 1,
}

macro_rules! ordinal_conversions {
    ($ty:ty { $($value:literal => $variant:expr),+ $(,)? }) => {
        impl TryFrom<u8> for $ty {
            type Error = LedgerError;

            fn try_from(value: u8) -> Result<Self> {
                match value {
                    $($value => Ok($variant),)+
                    other => Err(LedgerError::invalid_plain(format!(
                        "unknown {} ordinal {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }

        impl From<$ty> for u8 {
            fn from(value: $ty) -> u8 {
                value as u8
            }
        }
    };
}

ordinal_conversions!(TxTarget { 0 => TxTarget::Manual, 1 => TxTarget::SendAll });
ordinal_conversions!(TransferType { 0 => TransferType::Standard, 1 => TransferType::Delegate });
ordinal_conversions!(AssetKind { 0 => AssetKind::Native, 1 => AssetKind::Token });

// ============================================================================
// Balance snapshots
// ============================================================================

/// What is being transferred, with the balance snapshots of the source
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferAsset {
    /// Native coin; amount and fee come from `total_balance`
    Native { total_balance: Option<Amount> },
    /// ERC20 token; amount from the token balance, fee from the native balance
    Token {
        contract: String,
        transfer_type: TransferType,
        total_token_balance: Option<Amount>,
        total_ether_balance: Option<Amount>,
    },
}

impl TransferAsset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Native { .. } => AssetKind::Native,
            Self::Token { .. } => AssetKind::Token,
        }
    }
}

/// Source balances copied into a transfer when the source is picked
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceSnapshot {
    Native(Amount),
    Token { token: Amount, ether: Amount },
}

impl BalanceSnapshot {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Native(_) => AssetKind::Native,
            Self::Token { .. } => AssetKind::Token,
        }
    }

    /// Native snapshot from a ledger account, `None` while its balance is unknown
    pub fn native_from(account: &Account) -> Option<Self> {
        account.balance().map(Self::Native)
    }

    /// Token snapshot; the token balance is tracked outside the account ledger
    pub fn token_from(account: &Account, token_balance: Amount) -> Option<Self> {
        account.balance().map(|ether| Self::Token {
            token: token_balance,
            ether,
        })
    }
}

/// Gas settings applied to new transfers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferDefaults {
    pub gas_limit: u64,
    pub gas_price: Amount,
}

impl Default for TransferDefaults {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: Amount::ZERO,
        }
    }
}

// ============================================================================
// Transfer
// ============================================================================

/// Transfer intent, mutable until it is finalized for signing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Amount to deliver, excluding fees
    pub amount: Amount,
    /// Wei per unit of gas
    pub gas_price: Amount,
    pub gas_limit: u64,
    pub target: TxTarget,
    pub asset: TransferAsset,
}

impl Transfer {
    pub fn native() -> Self {
        Self::native_with(&TransferDefaults::default())
    }

    pub fn native_with(defaults: &TransferDefaults) -> Self {
        Self::with_asset(TransferAsset::Native {
            total_balance: None,
        }, defaults)
    }

    pub fn token(contract: impl Into<String>) -> Self {
        Self::token_with(contract, &TransferDefaults::default())
    }

    pub fn token_with(contract: impl Into<String>, defaults: &TransferDefaults) -> Self {
        Self::with_asset(
            TransferAsset::Token {
                contract: contract.into(),
                transfer_type: TransferType::Standard,
                total_token_balance: None,
                total_ether_balance: None,
            },
            defaults,
        )
    }

    fn with_asset(asset: TransferAsset, defaults: &TransferDefaults) -> Self {
        Self {
            from: None,
            to: None,
            amount: Amount::ZERO,
            gas_price: defaults.gas_price,
            gas_limit: defaults.gas_limit,
            target: TxTarget::Manual,
            asset,
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.asset.kind()
    }

    // ------------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------------

    /// Pick the source account and snapshot its balances
    pub fn set_from(&mut self, from: impl Into<String>, snapshot: BalanceSnapshot) -> Result<()> {
        match (&mut self.asset, snapshot) {
            (TransferAsset::Native { total_balance }, BalanceSnapshot::Native(balance)) => {
                *total_balance = Some(balance);
            }
            (
                TransferAsset::Token {
                    total_token_balance,
                    total_ether_balance,
                    ..
                },
                BalanceSnapshot::Token { token, ether },
            ) => {
                *total_token_balance = Some(token);
                *total_ether_balance = Some(ether);
            }
            (asset, snapshot) => {
                return Err(LedgerError::AssetMismatch {
                    expected: asset.kind(),
                    actual: snapshot.kind(),
                });
            }
        }
        self.from = Some(from.into());
        Ok(())
    }

    pub fn set_to(&mut self, to: impl Into<String>) {
        self.to = Some(to.into());
    }

    /// Set a user-entered amount; switches the transfer to [`TxTarget::Manual`]
    pub fn set_amount(&mut self, amount: Amount) {
        self.amount = amount;
        self.target = TxTarget::Manual;
    }

    pub fn set_target(&mut self, target: TxTarget) {
        self.target = target;
    }

    pub fn set_gas_price(&mut self, gas_price: Amount) {
        self.gas_price = gas_price;
    }

    pub fn set_gas_limit(&mut self, gas_limit: u64) {
        self.gas_limit = gas_limit;
    }

    pub fn set_transfer_type(&mut self, value: TransferType) -> Result<()> {
        match &mut self.asset {
            TransferAsset::Token { transfer_type, .. } => {
                *transfer_type = value;
                Ok(())
            }
            TransferAsset::Native { .. } => Err(LedgerError::AssetMismatch {
                expected: AssetKind::Native,
                actual: AssetKind::Token,
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Shared balance algorithm
    // ------------------------------------------------------------------------

    /// Balance the amount is drawn from
    fn transfer_balance(&self) -> Option<Amount> {
        match &self.asset {
            TransferAsset::Native { total_balance } => *total_balance,
            TransferAsset::Token {
                total_token_balance,
                ..
            } => *total_token_balance,
        }
    }

    /// Native balance the fee is drawn from
    fn fee_balance(&self) -> Option<Amount> {
        match &self.asset {
            TransferAsset::Native { total_balance } => *total_balance,
            TransferAsset::Token {
                total_ether_balance,
                ..
            } => *total_ether_balance,
        }
    }

    /// True when amount and fee come out of the same balance
    fn shares_fee_asset(&self) -> bool {
        matches!(self.asset, TransferAsset::Native { .. })
    }

    /// Everything taken from the fee balance
    fn fee_asset_spend(&self) -> Amount {
        let fees = self.fees();
        if self.shares_fee_asset() {
            self.total().checked_add(fees).unwrap_or(Amount::MAX)
        } else {
            fees
        }
    }

    // ------------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------------

    /// Amount delivered to the recipient
    pub fn total(&self) -> Amount {
        self.amount
    }

    /// Transfer-asset balance left after the amount, `None` while the balance is unknown
    pub fn change(&self) -> Option<Change> {
        self.transfer_balance()
            .map(|balance| Change::between(balance, self.total()))
    }

    /// Network fee in wei
    pub fn fees(&self) -> Amount {
        Amount::fee(self.gas_limit, self.gas_price)
    }

    /// Native balance left after the fee (and, for native transfers, the amount)
    pub fn fees_change(&self) -> Option<Change> {
        self.fee_balance()
            .map(|balance| Change::between(balance, self.fee_asset_spend()))
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Check the transfer against its balance snapshots
    ///
    /// Checks run in a fixed order and the first failure is returned: source, recipient,
    /// transfer-asset funds, fee funds.
    pub fn validate(&self) -> ValidationResult {
        if self.from.is_none() || self.transfer_balance().is_none() || self.fee_balance().is_none()
        {
            return ValidationResult::NoFrom;
        }
        if self.to.is_none() {
            return ValidationResult::NoTo;
        }
        if self.change().is_some_and(|c| c.is_shortfall()) {
            return if self.shares_fee_asset() {
                ValidationResult::InsufficientFunds
            } else {
                ValidationResult::InsufficientTokenFunds
            };
        }
        if self.fees_change().is_some_and(|c| c.is_shortfall()) {
            return ValidationResult::InsufficientFunds;
        }
        ValidationResult::Ok
    }

    /// Recompute `amount` for [`TxTarget::SendAll`]
    ///
    /// Token transfers send the whole token balance. Native transfers send the balance
    /// minus fees, the largest amount that still pays for itself. Returns `false` when the
    /// balance is unknown or cannot cover the fee; `amount` is then left unchanged.
    /// Always succeeds for [`TxTarget::Manual`].
    pub fn rebalance(&mut self) -> bool {
        if self.target == TxTarget::Manual {
            return true;
        }

        let available = match &self.asset {
            TransferAsset::Native { total_balance } => {
                total_balance.and_then(|balance| balance.checked_sub(self.fees()))
            }
            TransferAsset::Token {
                total_token_balance,
                ..
            } => *total_token_balance,
        };

        match available {
            Some(amount) => {
                self.amount = amount;
                true
            }
            None => {
                log::debug!("Send-all rebalance failed for {:?}", self.from);
                false
            }
        }
    }

    /// Rebalance, validate and produce the record handed to the signer
    pub fn finalize(&mut self) -> Result<SignRequest> {
        // a failed send-all rebalance always fails validation as well
        self.rebalance();
        let result = self.validate();
        if !result.is_ok() {
            return Err(LedgerError::Invalid(result));
        }

        let request = SignRequest::try_from(&*self)?;
        log::info!("Transfer ready for signing: {}", self);
        Ok(request)
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from.as_deref().unwrap_or("?");
        let to = self.to.as_deref().unwrap_or("?");
        let asset = match &self.asset {
            TransferAsset::Native { .. } => "wei".to_string(),
            TransferAsset::Token { contract, .. } => format!("units of {}", contract),
        };
        let change = self
            .change()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        write!(
            f,
            "Send {} {} from {} to {} using {} gas at {} wei, fees {} wei, change {}",
            self.total(),
            asset,
            from,
            to,
            self.gas_limit,
            self.gas_price,
            self.fees(),
            change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native_from(balance: u64) -> Transfer {
        let mut tx = Transfer::native();
        tx.set_from("0xfrom", BalanceSnapshot::Native(Amount::from(balance)))
            .unwrap();
        tx.set_to("0xto");
        tx
    }

    #[test]
    fn test_defaults() {
        let tx = Transfer::native();
        assert_eq!(tx.amount, Amount::ZERO);
        assert_eq!(tx.gas_price, Amount::ZERO);
        assert_eq!(tx.gas_limit, 21_000);
        assert_eq!(tx.target, TxTarget::Manual);
        assert_eq!(tx.kind(), AssetKind::Native);
    }

    #[test]
    fn test_snapshot_kind_mismatch() {
        let mut tx = Transfer::token("0xtoken");
        let err = tx
            .set_from("0xfrom", BalanceSnapshot::Native(Amount::from(1u64)))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AssetMismatch {
                expected: AssetKind::Token,
                actual: AssetKind::Native
            }
        ));
        assert!(tx.from.is_none());
    }

    #[test]
    fn test_native_fees_change_includes_amount() {
        let mut tx = native_from(100);
        tx.set_amount(Amount::from(60u64));
        tx.set_gas_limit(10);
        tx.set_gas_price(Amount::from(3u64));

        assert_eq!(tx.fees(), Amount::from(30u64));
        assert_eq!(tx.change(), Some(Change::Remaining(Amount::from(40u64))));
        assert_eq!(tx.fees_change(), Some(Change::Remaining(Amount::from(10u64))));
        assert_eq!(tx.validate(), ValidationResult::Ok);
    }

    #[test]
    fn test_native_send_all_leaves_room_for_fees() {
        let mut tx = native_from(100);
        tx.set_gas_limit(1);
        tx.set_gas_price(Amount::from(7u64));
        tx.set_target(TxTarget::SendAll);

        assert!(tx.rebalance());
        assert_eq!(tx.amount, Amount::from(93u64));
        assert_eq!(tx.validate(), ValidationResult::Ok);
        assert_eq!(tx.fees_change(), Some(Change::Remaining(Amount::ZERO)));
    }

    #[test]
    fn test_native_send_all_fails_when_fee_exceeds_balance() {
        let mut tx = native_from(5);
        tx.set_gas_limit(1);
        tx.set_gas_price(Amount::from(7u64));
        tx.set_target(TxTarget::SendAll);

        assert!(!tx.rebalance());
        assert_eq!(tx.amount, Amount::ZERO);
    }

    #[test]
    fn test_set_transfer_type_on_native_is_rejected() {
        let mut tx = Transfer::native();
        assert!(tx.set_transfer_type(TransferType::Delegate).is_err());

        let mut token = Transfer::token("0xtoken");
        token.set_transfer_type(TransferType::Delegate).unwrap();
        assert!(matches!(
            token.asset,
            TransferAsset::Token {
                transfer_type: TransferType::Delegate,
                ..
            }
        ));
    }

    #[test]
    fn test_display_summary() {
        let mut tx = native_from(100);
        tx.set_amount(Amount::from(10u64));
        let text = tx.to_string();
        assert!(text.starts_with("Send 10 wei from 0xfrom to 0xto"));
        assert!(text.ends_with("change 90"));

        let mut token = Transfer::token("0xtoken");
        token.set_amount(Amount::from(10u64));
        assert_eq!(
            token.to_string(),
            "Send 10 units of 0xtoken from ? to ? using 21000 gas at 0 wei, fees 0 wei, \
             change unknown"
        );
    }

    #[test]
    fn test_finalize_after_failed_send_all() {
        let mut tx = native_from(5);
        tx.set_gas_limit(1);
        tx.set_gas_price(Amount::from(7u64));
        tx.set_target(TxTarget::SendAll);

        assert!(matches!(
            tx.finalize(),
            Err(LedgerError::Invalid(ValidationResult::InsufficientFunds))
        ));
        assert_eq!(tx.amount, Amount::ZERO);

        let mut unknown = Transfer::token("0xtoken");
        unknown.from = Some("0xfrom".to_string());
        unknown.set_to("0xto");
        unknown.set_target(TxTarget::SendAll);
        assert!(matches!(
            unknown.finalize(),
            Err(LedgerError::Invalid(ValidationResult::NoFrom))
        ));
    }
}
