use serde::{Deserialize, Serialize};

use miser_core::Id;
use miser_crypto::EncryptedString;

/// System tag bound to the synthetic initial transaction (and its balance
/// snapshot) created by `Ledger::open_account`.
pub const SYSTEM_TAG_INITIAL: &str = "Initial";

/// A named label. `name` is encrypted at rest like any other user-supplied
/// text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub name: EncryptedString,
    pub deleted: bool,
}

impl Tag {
    pub fn new(id: Id, name: &str) -> Self {
        Self {
            id,
            name: EncryptedString::from(name),
            deleted: false,
        }
    }
}

/// Which kind of entity a [`TagBinding`] attaches a tag to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    AccountTag,
    TransactionTag,
    BalanceTag,
}

/// A many-to-many link between a tag and an item (account, transaction or
/// balance snapshot). Bindings are never deleted once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagBinding {
    pub id: Id,
    pub tag: Id,
    pub item: Id,
    pub kind: ItemKind,
}
