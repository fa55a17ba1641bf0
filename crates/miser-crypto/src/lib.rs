pub mod cipher;
pub mod id;

pub use cipher::{take_last_decrypt_failed, Cipher, CryptoError, EncryptedString};
pub use id::generate_id;
