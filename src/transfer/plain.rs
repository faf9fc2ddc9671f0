//! Plain form of a transfer
//!
//! Flat record of strings and numbers for storage and process boundaries. Amounts are
//! decimal strings in base units, enums are their ordinals, unset optionals are absent.
//!
//! `Transfer::from_plain(&tx.to_plain())` equals `tx` for every transfer.

use serde::{Deserialize, Serialize};

use super::{AssetKind, Transfer, TransferAsset, TransferType, TxTarget};
use crate::amount::Amount;
use crate::error::LedgerError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPlain {
    /// [`AssetKind`] ordinal
    pub asset: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// [`TxTarget`] ordinal
    pub target: u8,
    pub amount: String,
    pub gas_price: String,
    pub gas: u64,

    // Native only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_balance: Option<String>,

    // Token only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erc20: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_ether_balance: Option<String>,
    /// [`TransferType`] ordinal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_type: Option<u8>,
}

impl Transfer {
    pub fn to_plain(&self) -> TransferPlain {
        let mut plain = TransferPlain {
            asset: self.kind().into(),
            from: self.from.clone(),
            to: self.to.clone(),
            target: self.target.into(),
            amount: self.amount.to_decimal_string(),
            gas_price: self.gas_price.to_decimal_string(),
            gas: self.gas_limit,
            total_balance: None,
            erc20: None,
            total_token_balance: None,
            total_ether_balance: None,
            transfer_type: None,
        };

        match &self.asset {
            TransferAsset::Native { total_balance } => {
                plain.total_balance = total_balance.map(|b| b.to_decimal_string());
            }
            TransferAsset::Token {
                contract,
                transfer_type,
                total_token_balance,
                total_ether_balance,
            } => {
                plain.erc20 = Some(contract.clone());
                plain.transfer_type = Some((*transfer_type).into());
                plain.total_token_balance = total_token_balance.map(|b| b.to_decimal_string());
                plain.total_ether_balance = total_ether_balance.map(|b| b.to_decimal_string());
            }
        }

        plain
    }

    /// Rebuild a transfer, rejecting unknown ordinals, malformed amounts and fields that
    /// belong to the other asset kind
    pub fn from_plain(plain: &TransferPlain) -> Result<Self> {
        let kind = AssetKind::try_from(plain.asset)?;

        let asset = match kind {
            AssetKind::Native => {
                if plain.erc20.is_some()
                    || plain.total_token_balance.is_some()
                    || plain.total_ether_balance.is_some()
                    || plain.transfer_type.is_some()
                {
                    return Err(LedgerError::invalid_plain(
                        "native transfer carries token fields",
                    ));
                }
                TransferAsset::Native {
                    total_balance: parse_optional("totalBalance", &plain.total_balance)?,
                }
            }
            AssetKind::Token => {
                if plain.total_balance.is_some() {
                    return Err(LedgerError::invalid_plain(
                        "token transfer carries totalBalance",
                    ));
                }
                let contract = plain
                    .erc20
                    .clone()
                    .ok_or_else(|| LedgerError::invalid_plain("token transfer without erc20"))?;
                let transfer_type = match plain.transfer_type {
                    Some(ordinal) => TransferType::try_from(ordinal)?,
                    None => TransferType::Standard,
                };
                TransferAsset::Token {
                    contract,
                    transfer_type,
                    total_token_balance: parse_optional(
                        "totalTokenBalance",
                        &plain.total_token_balance,
                    )?,
                    total_ether_balance: parse_optional(
                        "totalEtherBalance",
                        &plain.total_ether_balance,
                    )?,
                }
            }
        };

        Ok(Self {
            from: plain.from.clone(),
            to: plain.to.clone(),
            amount: parse_field("amount", &plain.amount)?,
            gas_price: parse_field("gasPrice", &plain.gas_price)?,
            gas_limit: plain.gas,
            target: TxTarget::try_from(plain.target)?,
            asset,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_plain())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let plain: TransferPlain = serde_json::from_str(json)?;
        Self::from_plain(&plain)
    }
}

fn parse_field(field: &str, value: &str) -> Result<Amount> {
    Amount::parse_decimal(value)
        .map_err(|e| LedgerError::invalid_plain(format!("{}: {}", field, e)))
}

fn parse_optional(field: &str, value: &Option<String>) -> Result<Option<Amount>> {
    value.as_deref().map(|v| parse_field(field, v)).transpose()
}
