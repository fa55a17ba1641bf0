use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use miser_core::{Id, MiserError};
use miser_crypto::Cipher;
use miser_journal::{Account, JournalSink, JournalSource};

/// In-memory projection of the accounts journal. Replay is "latest wins":
/// appending a record with an ID already present overwrites the visible
/// entry for that ID.
#[derive(Default)]
pub struct AccountRegistry {
    items: RwLock<HashMap<Id, Account>>,
    pending: RwLock<Vec<Account>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `account` as the visible record for its ID. Returns 1 if
    /// the visible projection was created or changed, 0 if this is a pure
    /// deletion of a key that was never visible (nothing changed).
    pub fn add(&self, account: Account) -> usize {
        let mut items = self.items.write().unwrap();
        let existed = items.contains_key(&account.id);
        if account.deleted && !existed {
            return 0;
        }
        items.insert(account.id.clone(), account);
        1
    }

    /// Queues `account` to be written on the next flush. Does not affect
    /// the visible projection — call `add` as well if the caller wants the
    /// change to be immediately visible.
    pub fn enqueue(&self, account: Account) {
        self.pending.write().unwrap().push(account);
    }

    pub fn get(&self, id: &Id) -> Option<Account> {
        self.items
            .read()
            .unwrap()
            .get(id)
            .filter(|a| !a.deleted)
            .cloned()
    }

    pub fn list(&self) -> Vec<Account> {
        self.items
            .read()
            .unwrap()
            .values()
            .filter(|a| !a.deleted)
            .cloned()
            .collect()
    }

    pub fn load(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::load(self, path, cipher)
    }

    pub fn save(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::append(self, path, cipher)
    }
}

impl JournalSink<Account> for AccountRegistry {
    fn add(&self, record: Account) -> usize {
        AccountRegistry::add(self, record)
    }
}

impl JournalSource<Account> for AccountRegistry {
    fn pending_flush(&self) -> Vec<Account> {
        self.pending.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use miser_journal::AccountType;

    fn sample(id: &str) -> Account {
        Account::new(
            Id::from(id),
            "Checking",
            AccountType::Asset,
            "",
            "USD",
            Utc::now(),
        )
    }

    #[test]
    fn add_makes_the_record_visible() {
        let reg = AccountRegistry::new();
        assert_eq!(reg.add(sample("a1")), 1);
        assert!(reg.get(&Id::from("a1")).is_some());
    }

    #[test]
    fn deleting_an_unknown_id_reports_zero() {
        let reg = AccountRegistry::new();
        let mut deleted = sample("a1");
        deleted.deleted = true;
        assert_eq!(reg.add(deleted), 0);
        assert!(reg.get(&Id::from("a1")).is_none());
    }

    #[test]
    fn later_add_overwrites_earlier_on_same_id() {
        let reg = AccountRegistry::new();
        reg.add(sample("a1"));
        let mut renamed = sample("a1");
        renamed.name = "Savings".into();
        reg.add(renamed);
        assert_eq!(reg.get(&Id::from("a1")).unwrap().name.as_str(), "Savings");
    }
}
