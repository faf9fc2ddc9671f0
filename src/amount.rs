//! Base-unit amounts
//!
//! Every balance, transfer amount and fee is an [`Amount`]: an unsigned 256-bit integer
//! counted in the smallest unit of its asset (wei for the native coin, the token's
//! smallest unit for ERC20 balances). Decimals only exist at presentation time via
//! [`Amount::format_units`].
//!
//! Amounts cross JSON boundaries as decimal strings so values above 2^53 survive.

use alloy_primitives::{utils, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Amount of an asset in its base unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const MAX: Self = Self(U256::MAX);

    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Underlying integer
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a base-10 string of digits
    ///
    /// Signs, separators, hex prefixes and fractional parts are rejected; base units are
    /// integral by definition.
    pub fn parse_decimal(s: &str) -> Result<Self, LedgerError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::InvalidAmount(format!(
                "expected decimal digits, got {:?}",
                s
            )));
        }
        U256::from_str_radix(s, 10)
            .map(Self)
            .map_err(|e| LedgerError::InvalidAmount(format!("{}: {}", s, e)))
    }

    pub fn to_decimal_string(&self) -> String {
        self.0.to_string()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Network fee `gas_limit × gas_price`
    ///
    /// Saturates at [`Amount::MAX`]; a saturated fee can never be covered by a balance, so
    /// validation reports it as insufficient funds instead of wrapping.
    pub fn fee(gas_limit: u64, gas_price: Self) -> Self {
        Self(U256::from(gas_limit).saturating_mul(gas_price.0))
    }

    /// Render in whole units of an asset with `decimals` decimals, trailing zeros trimmed
    ///
    /// `Amount::from(1_500_000_000_000_000_000u128).format_units(18)` is `"1.5"`. Fails for
    /// more than 77 decimals, beyond what a 256-bit amount can carry.
    pub fn format_units(&self, decimals: u8) -> Result<String, LedgerError> {
        let formatted = utils::format_units(self.0, decimals)
            .map_err(|e| LedgerError::InvalidAmount(format!("{} decimals: {}", decimals, e)))?;

        match formatted.split_once('.') {
            Some((whole, frac)) => {
                let frac = frac.trim_end_matches('0');
                if frac.is_empty() {
                    Ok(whole.to_string())
                } else {
                    Ok(format!("{}.{}", whole, frac))
                }
            }
            None => Ok(formatted),
        }
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse_decimal(&s).map_err(serde::de::Error::custom)
    }
}

/// Outcome of `balance − spend` on unsigned amounts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// Balance covers the spend; this much is left
    Remaining(Amount),
    /// Spend exceeds the balance by this much
    Shortfall(Amount),
}

impl Change {
    pub fn between(balance: Amount, spend: Amount) -> Self {
        match balance.checked_sub(spend) {
            Some(left) => Self::Remaining(left),
            None => Self::Shortfall(Amount(spend.0 - balance.0)),
        }
    }

    pub fn is_shortfall(&self) -> bool {
        matches!(self, Self::Shortfall(_))
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(a) => write!(f, "{}", a),
            Self::Shortfall(a) => write!(f, "-{}", a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_rejects_non_digits() {
        assert!(Amount::parse_decimal("").is_err());
        assert!(Amount::parse_decimal("-1").is_err());
        assert!(Amount::parse_decimal("0x10").is_err());
        assert!(Amount::parse_decimal("1.5").is_err());
        assert_eq!(Amount::parse_decimal("0042").unwrap(), Amount::from(42u64));
    }

    #[test]
    fn test_parse_decimal_overflow() {
        let max = U256::MAX.to_string();
        assert_eq!(Amount::parse_decimal(&max).unwrap(), Amount::MAX);

        let too_big = format!("{}0", max);
        assert!(Amount::parse_decimal(&too_big).is_err());
    }

    #[test]
    fn test_fee_saturates() {
        assert_eq!(Amount::fee(21_000, Amount::from(2u64)), Amount::from(42_000u64));
        assert_eq!(Amount::fee(2, Amount::MAX), Amount::MAX);
        assert_eq!(Amount::fee(0, Amount::MAX), Amount::ZERO);
    }

    #[test]
    fn test_format_units() {
        let format = |value: u128, decimals: u8| {
            Amount::from(value).format_units(decimals).unwrap()
        };
        assert_eq!(format(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(format(5, 3), "0.005");
        assert_eq!(format(2000, 3), "2");
        assert_eq!(format(0, 18), "0");
        assert_eq!(format(250, 0), "250");
        assert_eq!(format(1_000_000_000_000_000_000, 18), "1");
    }

    #[test]
    fn test_format_units_rejects_excess_decimals() {
        assert!(matches!(
            Amount::from(1u64).format_units(78),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_change_between() {
        let hundred = Amount::from(100u64);
        assert_eq!(
            Change::between(hundred, Amount::from(30u64)),
            Change::Remaining(Amount::from(70u64))
        );
        assert_eq!(
            Change::between(hundred, Amount::from(101u64)),
            Change::Shortfall(Amount::from(1u64))
        );
        assert_eq!(Change::between(hundred, Amount::from(101u64)).to_string(), "-1");
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&Amount::from(1234u64)).unwrap();
        assert_eq!(json, "\"1234\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::from(1234u64));
    }
}
