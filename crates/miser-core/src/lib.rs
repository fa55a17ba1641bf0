pub mod currency;
pub mod error;
pub mod id;
pub mod money;

pub use currency::{lookup as lookup_currency, Currency};
pub use error::{ErrorKind, MiserError};
pub use id::Id;
pub use money::{from_decimal, to_decimal, Millionths};
