pub mod account;
pub mod balance;
pub mod tag;
pub mod tag_binding;
pub mod transaction;

pub use account::AccountRegistry;
pub use balance::BalanceRegistry;
pub use tag::TagRegistry;
pub use tag_binding::TagBindingRegistry;
pub use transaction::TransactionRegistry;
