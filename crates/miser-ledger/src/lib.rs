pub mod ledger;
pub mod sign;

pub use ledger::Ledger;
