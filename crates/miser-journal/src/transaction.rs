use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use miser_core::{Id, Millionths};
use miser_crypto::EncryptedString;

/// Clearing state of a transaction. Persisted as forward-compatible
/// metadata — nothing in the ledger currently transitions it except the
/// explicit `Ledger::set_transaction_state` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    Uncleared,
    Pending,
    Cleared,
}

impl Default for TransactionState {
    fn default() -> Self {
        TransactionState::Uncleared
    }
}

/// A posted transfer of value between two accounts. `memo` is held as
/// [`EncryptedString`]; everything else is clear-text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Id,
    pub source: Id,
    pub dest: Id,
    pub instant: DateTime<Utc>,
    pub memo: EncryptedString,
    pub value: Millionths,
    pub state: TransactionState,
    pub deleted: bool,
}

impl Transaction {
    /// A transaction is "initial" (the synthetic self-transfer created by
    /// `Ledger::open_account`) exactly when its source and destination are
    /// the same account.
    pub fn is_initial(&self) -> bool {
        self.source == self.dest
    }
}
