//! Account entries and the ledger snapshot

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::amount::Amount;
use crate::error::LedgerError;

/// Supported chains
///
/// Part of an account's identity: the same address on two chains is two accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Eth,
    Etc,
    Kovan,
    Morden,
}

impl Chain {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Etc => "etc",
            Self::Kovan => "kovan",
            Self::Morden => "morden",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Chain {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eth" => Ok(Self::Eth),
            "etc" => Ok(Self::Etc),
            "kovan" => Ok(Self::Kovan),
            "morden" => Ok(Self::Morden),
            other => Err(LedgerError::UnknownChain(other.to_string())),
        }
    }
}

/// One address on one chain, with metadata and balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Address, unique within its chain
    pub id: String,
    pub chain: Chain,
    pub name: Option<String>,
    pub description: Option<String>,
    pub hardware: bool,
    pub hd_path: Option<String>,
    /// Hidden accounts stay in the ledger and are only filtered for display
    pub hidden: bool,
    /// Last value received from the network, `None` until first fetched
    pub confirmed_balance: Option<Amount>,
    /// Predicted balance after a not-yet-confirmed transaction
    pub pending_balance: Option<Amount>,
    /// Sender nonce
    pub tx_count: Option<u64>,
}

impl Account {
    pub fn new(id: impl Into<String>, chain: Chain) -> Self {
        Self {
            id: id.into(),
            chain,
            name: None,
            description: None,
            hardware: false,
            hd_path: None,
            hidden: false,
            confirmed_balance: None,
            pending_balance: None,
            tx_count: None,
        }
    }

    /// Best known balance: the pending prediction if any, else the confirmed value
    pub fn balance(&self) -> Option<Amount> {
        self.pending_balance.or(self.confirmed_balance)
    }

    pub fn is_on(&self, chain: Chain, id: &str) -> bool {
        self.chain == chain && self.id == id
    }
}

/// Row of a full address-list refresh, as emitted by the network watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hardware: bool,
    #[serde(default)]
    pub hdpath: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    pub blockchain: Chain,
}

impl AddressRecord {
    pub fn new(address: impl Into<String>, blockchain: Chain) -> Self {
        Self {
            address: address.into(),
            name: None,
            description: None,
            hardware: false,
            hdpath: None,
            hidden: false,
            blockchain,
        }
    }

    /// Overwrite the identity and metadata fields of `account`, keeping its balances
    pub(crate) fn merge_into(&self, account: &mut Account) {
        account.name = self.name.clone();
        account.description = self.description.clone();
        account.hardware = self.hardware;
        account.hd_path = self.hdpath.clone();
        account.hidden = self.hidden;
        account.chain = self.blockchain;
    }
}

/// Immutable snapshot of all accounts
///
/// Cloning is cheap: the account list is shared until a reconciliation writes to it,
/// at which point the writer gets its own copy and earlier snapshots are untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    pub(crate) accounts: Arc<Vec<Account>>,
    pub(crate) loading: bool,
}

impl Ledger {
    /// Empty ledger, waiting for its first address list
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Vec::new()),
            loading: true,
        }
    }

    /// Ledger from stored accounts; a repeated `(chain, id)` keeps its first entry
    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        let mut seen: HashSet<(Chain, String)> = HashSet::with_capacity(accounts.len());
        let accounts: Vec<Account> = accounts
            .into_iter()
            .filter(|account| {
                let first = seen.insert((account.chain, account.id.clone()));
                if !first {
                    log::warn!(
                        "Duplicate account {} on {}, keeping the first",
                        account.id,
                        account.chain
                    );
                }
                first
            })
            .collect();

        Self {
            accounts: Arc::new(accounts),
            loading: true,
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// True until a full refresh has been applied
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// First account with this id on any chain
    pub fn find(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn find_on(&self, chain: Chain, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.is_on(chain, id))
    }

    /// Accounts that are not hidden, in ledger order
    pub fn visible(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(|a| !a.hidden)
    }

    pub fn on_chain(&self, chain: Chain) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(move |a| a.chain == chain)
    }

    /// True when both snapshots share the same account storage
    pub fn shares_storage_with(&self, other: &Ledger) -> bool {
        Arc::ptr_eq(&self.accounts, &other.accounts)
    }

    pub(crate) fn accounts_mut(&mut self) -> &mut Vec<Account> {
        Arc::make_mut(&mut self.accounts)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
