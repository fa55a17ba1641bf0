use thiserror::Error;

use crate::id::Id;

/// The five error kinds the ledger and its storage layer can surface.
///
/// Every [`MiserError`] variant maps to exactly one kind; callers that only
/// care about the category (rather than the exact variant) can match on
/// [`MiserError::kind`] instead of the full enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Decryption,
    Io,
    Codec,
}

#[derive(Debug, Error)]
pub enum MiserError {
    // ── Validation ───────────────────────────────────────────────────────
    #[error("account name must not be blank")]
    BlankName,

    #[error("unknown account type: {0}")]
    UnknownAccountType(String),

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("transaction amount must be greater than zero")]
    NonPositiveAmount,

    #[error("transaction instant must not be the zero instant")]
    ZeroInstant,

    #[error("transaction instant precedes opening of account {0}")]
    BeforeAccountOpened(Id),

    #[error("source and destination accounts must differ in type")]
    SameAccountType,

    #[error("insufficient balance: have {have}, need {need}")]
    Overdraft { have: i64, need: i64 },

    // ── Not found ────────────────────────────────────────────────────────
    #[error("account not found: {0}")]
    AccountNotFound(Id),

    #[error("transaction not found: {0}")]
    TransactionNotFound(Id),

    #[error("balance snapshot not found for account {account} transaction {transaction}")]
    BalanceNotFound { account: Id, transaction: Id },

    #[error("tag not found: {0}")]
    TagNotFound(String),

    // ── Decryption ───────────────────────────────────────────────────────
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    #[error("encryption key has not been installed")]
    KeyNotInstalled,

    // ── I/O ──────────────────────────────────────────────────────────────
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    // ── Codec ────────────────────────────────────────────────────────────
    #[error("malformed journal record: {0}")]
    Codec(String),
}

impl MiserError {
    pub fn kind(&self) -> ErrorKind {
        use MiserError::*;
        match self {
            BlankName
            | UnknownAccountType(_)
            | UnsupportedCurrency(_)
            | NonPositiveAmount
            | ZeroInstant
            | BeforeAccountOpened(_)
            | SameAccountType
            | Overdraft { .. } => ErrorKind::Validation,

            AccountNotFound(_) | TransactionNotFound(_) | BalanceNotFound { .. }
            | TagNotFound(_) => ErrorKind::NotFound,

            Decryption | KeyNotInstalled => ErrorKind::Decryption,

            Io(_) => ErrorKind::Io,

            Codec(_) => ErrorKind::Codec,
        }
    }
}
