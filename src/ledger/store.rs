//! JSON persistence for ledger snapshots
//!
//! The store keeps one pretty-printed JSON document per ledger:
//!
//! ```json
//! { "version": 1, "savedAt": "2024-05-01T12:00:00Z", "accounts": [ ... ] }
//! ```
//!
//! Every [`Account`] field is written, balances as decimal strings. A loaded ledger is
//! marked loading until the next full refresh arrives from the network. A file listing the
//! same `(chain, id)` twice loads its first entry only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::account::{Account, Ledger};
use crate::error::LedgerError;
use crate::Result;

const STORE_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLedger {
    version: u16,
    saved_at: DateTime<Utc>,
    accounts: Vec<Account>,
}

/// File-backed ledger store
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the snapshot, creating parent directories as needed
    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let stored = StoredLedger {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            accounts: ledger.accounts().to_vec(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, json)?;

        log::debug!("Saved {} accounts to {:?}", ledger.len(), self.path);
        Ok(())
    }

    pub fn load(&self) -> Result<Ledger> {
        if !self.exists() {
            return Err(LedgerError::Persistence(format!(
                "ledger file not found: {}",
                self.path.display()
            )));
        }

        let json = fs::read_to_string(&self.path)?;
        let stored: StoredLedger = serde_json::from_str(&json)?;
        if stored.version != STORE_VERSION {
            return Err(LedgerError::Persistence(format!(
                "unsupported ledger version {} in {}",
                stored.version,
                self.path.display()
            )));
        }

        log::info!(
            "Loaded {} accounts from {:?} (saved {})",
            stored.accounts.len(),
            self.path,
            stored.saved_at
        );
        Ok(Ledger::from_accounts(stored.accounts))
    }
}
