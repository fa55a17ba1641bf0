use std::cell::RefCell;
use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use serde::{de::Error as DeError, ser::Error as SerError, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use zeroize::Zeroize;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,
    #[error("encryption key has not been installed for this call")]
    KeyNotInstalled,
    #[error("encrypted envelope is shorter than the nonce")]
    Truncated,
}

/// A process-wide AES-256-GCM key, held as an explicit handle rather than a
/// bare global. Zeroized on drop.
pub struct Cipher {
    key: [u8; 32],
}

impl Cipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Seals `plaintext` behind a fresh random nonce. Two calls with the
    /// same plaintext never produce the same bytes.
    pub fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
            .expect("AES-256-GCM encryption of a bounded plaintext cannot fail");
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        out
    }

    /// Opens an envelope produced by [`Cipher::seal`]. Fails with
    /// [`CryptoError::Decryption`] on authentication-tag mismatch — this is
    /// the only failure mode once the envelope's length has been checked.
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if envelope.len() < NONCE_LEN {
            return Err(CryptoError::Truncated);
        }
        let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher
            .decrypt(nonce, Payload { msg: ciphertext, aad: &[] })
            .map_err(|_| CryptoError::Decryption)
    }

    /// Installs `self` as the active cipher for the duration of `f`. Every
    /// [`EncryptedString`] serialized or deserialized while `f` runs uses
    /// this key. Nestable: the previous active cipher (if any) is restored
    /// when `f` returns.
    pub fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        let key_copy = self.key;
        let previous = ACTIVE_KEY.with(|cell| cell.borrow_mut().replace(key_copy));
        let result = f();
        ACTIVE_KEY.with(|cell| *cell.borrow_mut() = previous);
        result
    }
}

impl Drop for Cipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cipher(..)")
    }
}

thread_local! {
    static ACTIVE_KEY: RefCell<Option<[u8; 32]>> = RefCell::new(None);
    static LAST_DECRYPT_FAILED: RefCell<bool> = RefCell::new(false);
}

fn with_active_cipher<R>(f: impl FnOnce(&Cipher) -> R) -> Result<R, CryptoError> {
    ACTIVE_KEY.with(|cell| {
        let guard = cell.borrow();
        match *guard {
            Some(key) => Ok(f(&Cipher::new(key))),
            None => Err(CryptoError::KeyNotInstalled),
        }
    })
}

/// Resets and reads the "last deserialization hit an authentication
/// failure" flag. `miser-journal`'s codec calls this right after a failed
/// `serde_json::from_str` to tell a genuine decryption failure apart from
/// an ordinary malformed line — `serde_json::Error` carries no downcastable
/// payload, so this thread-local flag is the bridge.
pub fn take_last_decrypt_failed() -> bool {
    LAST_DECRYPT_FAILED.with(|cell| cell.replace(false))
}

fn mark_decrypt_failed() {
    LAST_DECRYPT_FAILED.with(|cell| *cell.borrow_mut() = true);
}

/// A string held as plaintext in memory and sealed behind AES-256-GCM at
/// the journal serialization boundary. Opaque: no ordering, equality, or
/// substring search is defined on the ciphertext, and none is needed —
/// everything in this process compares the plaintext directly.
#[derive(Debug, Clone, Default)]
pub struct EncryptedString(String);

impl EncryptedString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for EncryptedString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EncryptedString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for EncryptedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for EncryptedString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for EncryptedString {}

impl Serialize for EncryptedString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let envelope = with_active_cipher(|cipher| cipher.seal(self.0.as_bytes()))
            .map_err(|e| S::Error::custom(e.to_string()))?;
        envelope.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EncryptedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let envelope = Vec::<u8>::deserialize(deserializer)?;
        let plaintext = with_active_cipher(|cipher| cipher.open(&envelope))
            .map_err(|e| D::Error::custom(e.to_string()))?
            .map_err(|e| {
                mark_decrypt_failed();
                D::Error::custom(e.to_string())
            })?;
        let s = String::from_utf8(plaintext).map_err(|e| D::Error::custom(e.to_string()))?;
        Ok(Self(s))
    }
}
