pub mod account;
pub mod balance;
pub mod codec;
pub mod tag;
pub mod transaction;

pub use account::{Account, AccountType};
pub use balance::BalanceSnapshot;
pub use codec::{
    append, load, JournalSink, JournalSource, ACCOUNTS_FILE, BALANCES_FILE, TAGS_FILE,
    TAG_BINDINGS_FILE, TRANSACTIONS_FILE,
};
pub use tag::{ItemKind, Tag, TagBinding, SYSTEM_TAG_INITIAL};
pub use transaction::{Transaction, TransactionState};
