//! Single-writer ledger service
//!
//! Holds the current snapshot in a `tokio::sync::watch` channel. The owner applies events
//! one at a time through `&mut self`, so two reconciliations can never race on one
//! ledger; readers clone whole snapshots or subscribe for change notifications and never
//! see a half-applied event.
//!
//! When a store is attached, the snapshot is saved after every event that changed it.
//! Save failures are logged and do not undo the event.

use tokio::sync::watch;

use super::account::Ledger;
use super::reconciler::{reconcile, LedgerEvent};
use super::store::LedgerStore;
use crate::config::LedgerConfig;
use crate::Result;

pub struct LedgerService {
    sender: watch::Sender<Ledger>,
    store: Option<LedgerStore>,
}

impl LedgerService {
    /// In-memory service without persistence
    pub fn new(ledger: Ledger) -> Self {
        let (sender, _) = watch::channel(ledger);
        Self {
            sender,
            store: None,
        }
    }

    /// Service backed by `store`, starting from its saved snapshot if there is one
    pub fn open(store: LedgerStore) -> Result<Self> {
        let ledger = if store.exists() {
            store.load()?
        } else {
            log::info!("No ledger at {:?}, starting empty", store.path());
            Ledger::new()
        };

        let (sender, _) = watch::channel(ledger);
        Ok(Self {
            sender,
            store: Some(store),
        })
    }

    /// Persistent if the config names a store path, in-memory otherwise
    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        match &config.store_path {
            Some(path) => Self::open(LedgerStore::new(path.clone())),
            None => Ok(Self::new(Ledger::new())),
        }
    }

    /// Reconcile one event and publish the result
    ///
    /// Returns whether the snapshot changed. On error the current snapshot stays
    /// published unchanged.
    pub fn apply(&mut self, event: LedgerEvent) -> Result<bool> {
        let next = reconcile(&self.sender.borrow(), event)?;

        let changed = self.sender.send_if_modified(|current| {
            if next.shares_storage_with(current) && next.loading == current.loading {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            self.autosave();
        }
        Ok(changed)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Ledger {
        self.sender.borrow().clone()
    }

    /// Receiver notified after every change
    pub fn subscribe(&self) -> watch::Receiver<Ledger> {
        self.sender.subscribe()
    }

    pub fn store(&self) -> Option<&LedgerStore> {
        self.store.as_ref()
    }

    /// Save the current snapshot now; no-op without a store
    pub fn save(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.sender.borrow()),
            None => Ok(()),
        }
    }

    fn autosave(&self) {
        if let Err(e) = self.save() {
            log::warn!("Failed to auto-save ledger: {}", e);
        }
    }
}
