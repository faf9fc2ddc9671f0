//! Record handed to the signer

use serde::{Deserialize, Serialize};

use super::{AssetKind, Transfer, TransferAsset, TransferType, ValidationResult};
use crate::amount::Amount;
use crate::error::LedgerError;

/// Unsigned transfer, ready for signing and broadcast
///
/// Produced by [`Transfer::finalize`]. Encoded like the plain form: amounts are decimal
/// strings in base units, `asset` and `transferType` are ordinals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub asset: AssetKind,
    pub from: String,
    pub to: String,
    pub gas_price: Amount,
    pub gas: u64,
    pub amount: Amount,
    /// Token contract, token transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_type: Option<TransferType>,
}

impl TryFrom<&Transfer> for SignRequest {
    type Error = LedgerError;

    fn try_from(tx: &Transfer) -> Result<Self, Self::Error> {
        let from = tx
            .from
            .clone()
            .ok_or(LedgerError::Invalid(ValidationResult::NoFrom))?;
        let to = tx
            .to
            .clone()
            .ok_or(LedgerError::Invalid(ValidationResult::NoTo))?;

        let (contract, transfer_type) = match &tx.asset {
            TransferAsset::Native { .. } => (None, None),
            TransferAsset::Token {
                contract,
                transfer_type,
                ..
            } => (Some(contract.clone()), Some(*transfer_type)),
        };

        Ok(Self {
            asset: tx.kind(),
            from,
            to,
            gas_price: tx.gas_price,
            gas: tx.gas_limit,
            amount: tx.total(),
            contract,
            transfer_type,
        })
    }
}
