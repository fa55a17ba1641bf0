use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use miser_core::{Id, MiserError};
use miser_crypto::Cipher;
use miser_journal::{BalanceSnapshot, JournalSink, JournalSource};

/// In-memory projection of the balances journal, keyed by
/// `(account, transaction)`. A later snapshot on the same key overwrites
/// the earlier one in the visible projection — this is how retroactive
/// balance propagation appears to a reader without ever rewriting history.
#[derive(Default)]
pub struct BalanceRegistry {
    items: RwLock<HashMap<(Id, Id), BalanceSnapshot>>,
    pending: RwLock<Vec<BalanceSnapshot>>,
}

impl BalanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, snapshot: BalanceSnapshot) -> usize {
        let key = (snapshot.account.clone(), snapshot.transaction.clone());
        self.items.write().unwrap().insert(key, snapshot);
        1
    }

    pub fn enqueue(&self, snapshot: BalanceSnapshot) {
        self.pending.write().unwrap().push(snapshot);
    }

    pub fn get(&self, account: &Id, transaction: &Id) -> Option<BalanceSnapshot> {
        self.items
            .read()
            .unwrap()
            .get(&(account.clone(), transaction.clone()))
            .cloned()
    }

    pub fn load(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::load(self, path, cipher)
    }

    pub fn save(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::append(self, path, cipher)
    }
}

impl JournalSink<BalanceSnapshot> for BalanceRegistry {
    fn add(&self, record: BalanceSnapshot) -> usize {
        BalanceRegistry::add(self, record)
    }
}

impl JournalSource<BalanceSnapshot> for BalanceRegistry {
    fn pending_flush(&self) -> Vec<BalanceSnapshot> {
        self.pending.read().unwrap().clone()
    }
}
