use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use miser_core::{Id, MiserError};
use miser_crypto::EncryptedString;

/// The five account types a double-entry ledger recognises. Determines
/// which side of a transaction increases or decreases an account's balance
/// (see `miser_ledger::sign`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Income => "Income",
            AccountType::Expense => "Expense",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AccountType {
    type Err = MiserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Asset" => Ok(AccountType::Asset),
            "Liability" => Ok(AccountType::Liability),
            "Equity" => Ok(AccountType::Equity),
            "Income" => Ok(AccountType::Income),
            "Expense" => Ok(AccountType::Expense),
            other => Err(MiserError::UnknownAccountType(other.to_string())),
        }
    }
}

/// A ledger account. `name`, `account_type` and `description` are held as
/// [`EncryptedString`] — plaintext in memory, ciphertext on disk (see
/// `miser_crypto::cipher`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Id,
    pub name: EncryptedString,
    pub account_type: EncryptedString,
    pub description: EncryptedString,
    pub currency_code: EncryptedString,
    pub opened_at: DateTime<Utc>,
    /// Set by a future closing operation; `None` means still open. No
    /// operation in this system sets it yet — carried in the data model
    /// for parity with the original, which defines the field and an
    /// `is_closed` helper but never assigns it either.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Account {
    pub fn new(
        id: Id,
        name: &str,
        account_type: AccountType,
        description: &str,
        currency_code: &str,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: EncryptedString::from(name),
            account_type: EncryptedString::from(account_type.to_string().as_str()),
            description: EncryptedString::from(description),
            currency_code: EncryptedString::from(currency_code),
            opened_at,
            closed_at: None,
            deleted: false,
        }
    }

    /// Parses the plaintext held by `account_type` back into the typed
    /// enum. Infallible in practice: the string was produced by
    /// `AccountType::to_string` at construction time, but a corrupted
    /// journal entry could in principle contain anything, so this still
    /// returns a `Result`.
    pub fn account_type(&self) -> Result<AccountType, MiserError> {
        self.account_type.as_str().parse()
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}
