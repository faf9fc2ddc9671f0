//! Ledger reconciliation
//!
//! Every function here is a pure state transition: it reads a [`Ledger`] snapshot and an
//! event and returns the next snapshot. The input is never modified, and a transition
//! that changes nothing hands back a snapshot sharing the same storage.
//!
//! ## Matching rules
//!
//! - Full refresh and account addition match on `(chain, id)`.
//! - Balance, metadata, hd path, tx count and pending updates match on `id` alone and
//!   touch the first account with that id. When an address exists on several chains this
//!   is ambiguous; it is logged, and [`apply_confirmed_balance_on`] is the
//!   caller-disambiguated alternative for balance updates.
//! - Updates addressed to unknown ids are no-ops, except [`apply_pending_delta`], which
//!   fails: a predicted balance computed from nothing would be a wrong number.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::account::{Account, AddressRecord, Chain, Ledger};
use crate::amount::Amount;
use crate::error::LedgerError;
use crate::Result;

/// Effect of a constructed but unconfirmed transaction on its endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelta {
    /// Receiving account, credited with `value`
    pub to: Option<String>,
    /// Sending account, debited by `value`
    pub from: Option<String>,
    pub value: Amount,
}

/// Inbound events, from the network watcher or from local user actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum LedgerEvent {
    /// An address-list fetch has started
    Loading,
    /// Full address list, optionally scoped to one chain
    SetList {
        accounts: Vec<AddressRecord>,
        #[serde(default)]
        chain: Option<Chain>,
    },
    /// Confirmed balance from the network; `chain` disambiguates shared addresses
    SetBalance {
        account_id: String,
        #[serde(default)]
        chain: Option<Chain>,
        value: Amount,
    },
    UpdateAccount {
        account_id: String,
        name: Option<String>,
        description: Option<String>,
    },
    AddAccount {
        account_id: String,
        chain: Chain,
        name: Option<String>,
        description: Option<String>,
    },
    SetHdPath {
        account_id: String,
        hd_path: Option<String>,
    },
    SetTxCount {
        account_id: String,
        value: u64,
    },
    PendingBalance(PendingDelta),
}

/// Apply one event to a snapshot
///
/// Only pending-balance events can fail; everything else is total.
pub fn reconcile(ledger: &Ledger, event: LedgerEvent) -> Result<Ledger> {
    log::debug!("Reconciling event: {:?}", event);

    let next = match event {
        LedgerEvent::Loading => apply_loading(ledger),
        LedgerEvent::SetList { accounts, chain } => apply_full_refresh(ledger, &accounts, chain),
        LedgerEvent::SetBalance {
            account_id,
            chain: Some(chain),
            value,
        } => apply_confirmed_balance_on(ledger, chain, &account_id, value),
        LedgerEvent::SetBalance {
            account_id,
            chain: None,
            value,
        } => apply_confirmed_balance(ledger, &account_id, value),
        LedgerEvent::UpdateAccount {
            account_id,
            name,
            description,
        } => apply_metadata_update(ledger, &account_id, name, description),
        LedgerEvent::AddAccount {
            account_id,
            chain,
            name,
            description,
        } => apply_account_added(ledger, &account_id, chain, name, description),
        LedgerEvent::SetHdPath {
            account_id,
            hd_path,
        } => apply_hd_path(ledger, &account_id, hd_path),
        LedgerEvent::SetTxCount { account_id, value } => {
            apply_tx_count(ledger, &account_id, value)
        }
        LedgerEvent::PendingBalance(delta) => apply_pending_delta(ledger, &delta)?,
    };

    Ok(next)
}

// ============================================================================
// Address list
// ============================================================================

/// Mark the ledger as waiting for an address list
pub fn apply_loading(ledger: &Ledger) -> Ledger {
    let mut next = ledger.clone();
    next.loading = true;
    next
}

/// Replace the account list with a fresh one from the network
///
/// Existing `(chain, id)` matches keep their confirmed balance, pending balance and tx
/// count; identity and metadata come from the incoming rows. With `scope`, only accounts
/// of that chain are replaced and the other chains' accounts follow the refreshed rows in
/// their previous order.
pub fn apply_full_refresh(
    ledger: &Ledger,
    records: &[AddressRecord],
    scope: Option<Chain>,
) -> Ledger {
    let mut seen: HashSet<(Chain, &str)> = HashSet::with_capacity(records.len());
    let mut refreshed: Vec<Account> = Vec::with_capacity(records.len());

    for record in records {
        if let Some(scope) = scope {
            if record.blockchain != scope {
                log::warn!(
                    "Ignoring {} address {} in a refresh scoped to {}",
                    record.blockchain,
                    record.address,
                    scope
                );
                continue;
            }
        }
        if !seen.insert((record.blockchain, record.address.as_str())) {
            log::warn!(
                "Duplicate address {} on {} in refresh, keeping the first",
                record.address,
                record.blockchain
            );
            continue;
        }

        let mut account = ledger
            .find_on(record.blockchain, &record.address)
            .cloned()
            .unwrap_or_else(|| Account::new(record.address.clone(), record.blockchain));
        record.merge_into(&mut account);
        refreshed.push(account);
    }

    if let Some(scope) = scope {
        refreshed.extend(ledger.accounts.iter().filter(|a| a.chain != scope).cloned());
    }

    log::debug!(
        "Address list refreshed: {} accounts (scope: {:?})",
        refreshed.len(),
        scope
    );

    Ledger {
        accounts: Arc::new(refreshed),
        loading: false,
    }
}

/// Append a new account unless `(chain, id)` is already present
pub fn apply_account_added(
    ledger: &Ledger,
    account_id: &str,
    chain: Chain,
    name: Option<String>,
    description: Option<String>,
) -> Ledger {
    if ledger.find_on(chain, account_id).is_some() {
        log::debug!("Account {} on {} already known", account_id, chain);
        return ledger.clone();
    }

    let mut account = Account::new(account_id, chain);
    account.name = name;
    account.description = description;

    let mut next = ledger.clone();
    next.accounts_mut().push(account);
    next
}

// ============================================================================
// Single-account updates
// ============================================================================

/// Set the confirmed balance of the first account with this id and clear its prediction
///
/// When the value equals the stored one the stored value is kept as is and only the
/// pending balance is cleared.
pub fn apply_confirmed_balance(ledger: &Ledger, account_id: &str, value: Amount) -> Ledger {
    warn_if_ambiguous(ledger, account_id);
    match position_by_id(ledger, account_id) {
        Some(pos) => set_confirmed_at(ledger, pos, value),
        None => {
            log::warn!("Balance update for unknown account {}", account_id);
            ledger.clone()
        }
    }
}

/// [`apply_confirmed_balance`] for a caller that knows the chain
pub fn apply_confirmed_balance_on(
    ledger: &Ledger,
    chain: Chain,
    account_id: &str,
    value: Amount,
) -> Ledger {
    match ledger.accounts.iter().position(|a| a.is_on(chain, account_id)) {
        Some(pos) => set_confirmed_at(ledger, pos, value),
        None => {
            log::warn!("Balance update for unknown account {} on {}", account_id, chain);
            ledger.clone()
        }
    }
}

fn set_confirmed_at(ledger: &Ledger, pos: usize, value: Amount) -> Ledger {
    let current = &ledger.accounts[pos];
    let unchanged = current.confirmed_balance == Some(value);

    if unchanged && current.pending_balance.is_none() {
        return ledger.clone();
    }

    let mut next = ledger.clone();
    let account = &mut next.accounts_mut()[pos];
    if !unchanged {
        account.confirmed_balance = Some(value);
    }
    account.pending_balance = None;
    next
}

pub fn apply_metadata_update(
    ledger: &Ledger,
    account_id: &str,
    name: Option<String>,
    description: Option<String>,
) -> Ledger {
    update_by_id(ledger, account_id, |account| {
        account.name = name;
        account.description = description;
    })
}

pub fn apply_hd_path(ledger: &Ledger, account_id: &str, hd_path: Option<String>) -> Ledger {
    update_by_id(ledger, account_id, |account| account.hd_path = hd_path)
}

pub fn apply_tx_count(ledger: &Ledger, account_id: &str, value: u64) -> Ledger {
    update_by_id(ledger, account_id, |account| account.tx_count = Some(value))
}

/// Record the predicted balances of a transaction that is built but not yet confirmed
///
/// The receiver's prediction is its confirmed balance plus `value`, the sender's is its
/// confirmed balance minus `value`. A transfer to self predicts no change. Both endpoints
/// must be known accounts with a confirmed balance; otherwise nothing is applied.
pub fn apply_pending_delta(ledger: &Ledger, delta: &PendingDelta) -> Result<Ledger> {
    let mut next = ledger.clone();

    match (&delta.to, &delta.from) {
        (None, None) => {
            log::warn!("Pending delta without endpoints ignored");
        }
        (Some(to), Some(from)) if to == from => {
            let (pos, confirmed) = confirmed_for(ledger, to)?;
            next.accounts_mut()[pos].pending_balance = Some(confirmed);
        }
        (to, from) => {
            if let Some(to) = to {
                let (pos, confirmed) = confirmed_for(ledger, to)?;
                let predicted = confirmed.checked_add(delta.value).ok_or_else(|| {
                    LedgerError::Overflow(format!("{} + {} for {}", confirmed, delta.value, to))
                })?;
                next.accounts_mut()[pos].pending_balance = Some(predicted);
            }
            if let Some(from) = from {
                let (pos, confirmed) = confirmed_for(ledger, from)?;
                let predicted = confirmed.checked_sub(delta.value).ok_or_else(|| {
                    LedgerError::Underflow(format!(
                        "{} - {} for {}",
                        confirmed, delta.value, from
                    ))
                })?;
                next.accounts_mut()[pos].pending_balance = Some(predicted);
            }
        }
    }

    Ok(next)
}

// ============================================================================
// Helpers
// ============================================================================

fn position_by_id(ledger: &Ledger, account_id: &str) -> Option<usize> {
    ledger.accounts.iter().position(|a| a.id == account_id)
}

fn update_by_id<F>(ledger: &Ledger, account_id: &str, f: F) -> Ledger
where
    F: FnOnce(&mut Account),
{
    warn_if_ambiguous(ledger, account_id);
    match position_by_id(ledger, account_id) {
        Some(pos) => {
            let mut next = ledger.clone();
            f(&mut next.accounts_mut()[pos]);
            next
        }
        None => {
            log::warn!("Update for unknown account {} ignored", account_id);
            ledger.clone()
        }
    }
}

fn confirmed_for(ledger: &Ledger, account_id: &str) -> Result<(usize, Amount)> {
    warn_if_ambiguous(ledger, account_id);
    let pos = position_by_id(ledger, account_id)
        .ok_or_else(|| LedgerError::account_not_found(account_id))?;
    let confirmed = ledger.accounts[pos]
        .confirmed_balance
        .ok_or_else(|| LedgerError::BalanceUnknown(account_id.to_string()))?;
    Ok((pos, confirmed))
}

fn warn_if_ambiguous(ledger: &Ledger, account_id: &str) {
    let matches = ledger.accounts.iter().filter(|a| a.id == account_id).count();
    if matches > 1 {
        log::warn!(
            "Account id {} exists on {} chains; updating the first match",
            account_id,
            matches
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(accounts: Vec<Account>) -> Ledger {
        Ledger::from_accounts(accounts)
    }

    fn funded(id: &str, chain: Chain, confirmed: u64) -> Account {
        let mut account = Account::new(id, chain);
        account.confirmed_balance = Some(Amount::from(confirmed));
        account
    }

    #[test]
    fn test_noop_updates_share_storage() {
        let ledger = ledger_with(vec![funded("0xa", Chain::Eth, 10)]);

        let next = apply_tx_count(&ledger, "0xmissing", 3);
        assert!(next.shares_storage_with(&ledger));

        let next = apply_confirmed_balance(&ledger, "0xa", Amount::from(10u64));
        assert!(next.shares_storage_with(&ledger));
    }

    #[test]
    fn test_update_does_not_touch_input_snapshot() {
        let ledger = ledger_with(vec![Account::new("0xa", Chain::Eth)]);
        let next = apply_hd_path(&ledger, "0xa", Some("m/44'/60'/0'/0/0".to_string()));

        assert_eq!(ledger.accounts()[0].hd_path, None);
        assert_eq!(
            next.accounts()[0].hd_path.as_deref(),
            Some("m/44'/60'/0'/0/0")
        );
    }

    #[test]
    fn test_pending_delta_to_self_predicts_confirmed() {
        let ledger = ledger_with(vec![funded("0xa", Chain::Eth, 50)]);
        let delta = PendingDelta {
            to: Some("0xa".to_string()),
            from: Some("0xa".to_string()),
            value: Amount::from(20u64),
        };

        let next = apply_pending_delta(&ledger, &delta).unwrap();
        assert_eq!(next.accounts()[0].pending_balance, Some(Amount::from(50u64)));
    }

    #[test]
    fn test_pending_delta_failure_is_atomic() {
        let ledger = ledger_with(vec![
            funded("0xto", Chain::Eth, 5),
            Account::new("0xfrom", Chain::Eth),
        ]);
        let delta = PendingDelta {
            to: Some("0xto".to_string()),
            from: Some("0xfrom".to_string()),
            value: Amount::from(1u64),
        };

        let err = apply_pending_delta(&ledger, &delta).unwrap_err();
        assert!(matches!(err, LedgerError::BalanceUnknown(ref id) if id == "0xfrom"));
        assert_eq!(ledger.accounts()[0].pending_balance, None);
    }

    #[test]
    fn test_pending_delta_underflow() {
        let ledger = ledger_with(vec![funded("0xa", Chain::Eth, 5)]);
        let delta = PendingDelta {
            to: None,
            from: Some("0xa".to_string()),
            value: Amount::from(6u64),
        };

        assert!(matches!(
            apply_pending_delta(&ledger, &delta),
            Err(LedgerError::Underflow(_))
        ));
    }
}
