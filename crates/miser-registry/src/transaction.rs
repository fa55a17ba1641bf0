use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use miser_core::{Id, MiserError};
use miser_crypto::Cipher;
use miser_journal::{JournalSink, JournalSource, Transaction};

/// In-memory projection of the transactions journal, plus a per-account
/// chronological index so the temporal queries (`last`, `first_before`,
/// `all_after`) never linear-scan the full map.
///
/// Two transactions can legitimately share the same `instant` (the most
/// common case: a posted transaction backdated to exactly an account's
/// `opened_at`, which is also the initial transaction's own instant), so
/// the index orders entries by `(instant, sequence)` rather than by
/// instant alone. `sequence` is assigned by `add` in commit order and is
/// never serialized — replaying the journal reproduces it deterministically
/// because `load` always calls `add` in file order.
#[derive(Default)]
pub struct TransactionRegistry {
    items: RwLock<HashMap<Id, Transaction>>,
    pending: RwLock<Vec<Transaction>>,
    /// account -> (instant, sequence) -> transaction id touching it at that
    /// point (as source or destination). Entries are never removed on
    /// delete; `get` filters deleted transactions out at read time, so a
    /// stale index entry simply yields nothing.
    index: RwLock<HashMap<Id, BTreeMap<(DateTime<Utc>, u64), Id>>>,
    seq_by_tx: RwLock<HashMap<Id, u64>>,
    next_seq: RwLock<u64>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tx: Transaction) -> usize {
        let mut items = self.items.write().unwrap();
        let existed = items.contains_key(&tx.id);
        if tx.deleted && !existed {
            return 0;
        }

        // Re-adding an id already in the index (e.g. `set_transaction_state`)
        // must drop its old (instant, sequence) index entry first, or the
        // stale entry lingers alongside the fresh one and the transaction
        // appears twice in `all_after_tx`/`touching`.
        if let Some(old) = items.get(&tx.id) {
            if let Some(old_seq) = self.seq_by_tx.read().unwrap().get(&tx.id).copied() {
                let old_key = (old.instant, old_seq);
                self.index_remove(&old.source, old_key);
                self.index_remove(&old.dest, old_key);
            }
        }

        let seq = {
            let mut next = self.next_seq.write().unwrap();
            let seq = *next;
            *next += 1;
            seq
        };
        self.seq_by_tx.write().unwrap().insert(tx.id.clone(), seq);
        self.index_touch(&tx.source, tx.instant, seq, &tx.id);
        self.index_touch(&tx.dest, tx.instant, seq, &tx.id);
        items.insert(tx.id.clone(), tx);
        1
    }

    fn index_touch(&self, account: &Id, instant: DateTime<Utc>, seq: u64, tx: &Id) {
        self.index
            .write()
            .unwrap()
            .entry(account.clone())
            .or_default()
            .insert((instant, seq), tx.clone());
    }

    fn index_remove(&self, account: &Id, key: (DateTime<Utc>, u64)) {
        if let Some(by_key) = self.index.write().unwrap().get_mut(account) {
            by_key.remove(&key);
        }
    }

    pub fn enqueue(&self, tx: Transaction) {
        self.pending.write().unwrap().push(tx);
    }

    pub fn get(&self, id: &Id) -> Option<Transaction> {
        self.items
            .read()
            .unwrap()
            .get(id)
            .filter(|t| !t.deleted)
            .cloned()
    }

    fn key_of(&self, tx_id: &Id) -> Option<(DateTime<Utc>, u64)> {
        let instant = self.items.read().unwrap().get(tx_id)?.instant;
        let seq = *self.seq_by_tx.read().unwrap().get(tx_id)?;
        Some((instant, seq))
    }

    /// The visible transaction touching `account` with the greatest
    /// `(instant, sequence)`, if any.
    pub fn last(&self, account: &Id) -> Option<Transaction> {
        let index = self.index.read().unwrap();
        let by_key = index.get(account)?;
        by_key.iter().rev().find_map(|(_, id)| self.get(id))
    }

    /// The visible transaction touching `account` with the greatest
    /// instant strictly before `instant`, ignoring same-instant ties.
    /// Used for ad-hoc point-in-time queries; prefer
    /// [`Self::first_before_tx`] when resolving a specific transaction's
    /// predecessor, since that also breaks same-instant ties correctly.
    pub fn first_before(&self, account: &Id, instant: DateTime<Utc>) -> Option<Transaction> {
        let index = self.index.read().unwrap();
        let by_key = index.get(account)?;
        by_key
            .range((Unbounded, Excluded((instant, 0))))
            .rev()
            .find_map(|(_, id)| self.get(id))
    }

    /// The visible transaction touching `account` that immediately
    /// precedes `tx_id` in chronological-then-insertion order. Same-instant
    /// ties resolve by insertion order, so a transaction backdated to
    /// exactly its account's `opened_at` still finds the initial
    /// transaction as its predecessor.
    pub fn first_before_tx(&self, account: &Id, tx_id: &Id) -> Option<Transaction> {
        let key = self.key_of(tx_id)?;
        let index = self.index.read().unwrap();
        let by_key = index.get(account)?;
        by_key
            .range((Unbounded, Excluded(key)))
            .rev()
            .find_map(|(_, id)| self.get(id))
    }

    /// All visible transactions touching `account` with an instant
    /// strictly after `instant`, ignoring same-instant ties. See
    /// [`Self::all_after_tx`] for tie-aware shifting.
    pub fn all_after(&self, account: &Id, instant: DateTime<Utc>) -> Vec<Transaction> {
        let index = self.index.read().unwrap();
        let Some(by_key) = index.get(account) else {
            return Vec::new();
        };
        by_key
            .range((Excluded((instant, u64::MAX)), Unbounded))
            .filter_map(|(_, id)| self.get(id))
            .collect()
    }

    /// Every visible transaction touching `account` that comes strictly
    /// after `tx_id` in chronological-then-insertion order. Ties at the
    /// same instant as `tx_id` but inserted later are included, so
    /// retroactive propagation shifts exactly the transactions that were
    /// already resting on the snapshot `tx_id` just displaced.
    pub fn all_after_tx(&self, account: &Id, tx_id: &Id) -> Vec<Transaction> {
        let Some(key) = self.key_of(tx_id) else {
            return Vec::new();
        };
        let index = self.index.read().unwrap();
        let Some(by_key) = index.get(account) else {
            return Vec::new();
        };
        by_key
            .range((Excluded(key), Unbounded))
            .filter_map(|(_, id)| self.get(id))
            .collect()
    }

    /// Every visible transaction touching `account`, in no particular
    /// order. Used by account deletion, which must mark all of them.
    pub fn touching(&self, account: &Id) -> Vec<Transaction> {
        let index = self.index.read().unwrap();
        let Some(by_key) = index.get(account) else {
            return Vec::new();
        };
        by_key.values().filter_map(|id| self.get(id)).collect()
    }

    pub fn load(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::load(self, path, cipher)
    }

    pub fn save(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::append(self, path, cipher)
    }
}

impl JournalSink<Transaction> for TransactionRegistry {
    fn add(&self, record: Transaction) -> usize {
        TransactionRegistry::add(self, record)
    }
}

impl JournalSource<Transaction> for TransactionRegistry {
    fn pending_flush(&self) -> Vec<Transaction> {
        self.pending.read().unwrap().clone()
    }
}
