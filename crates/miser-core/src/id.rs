use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque entity identifier: 20 lowercase hex characters, derived from 10
/// bytes of CSPRNG randomness (see `miser-crypto::id::generate_id`).
///
/// Collisions are not checked for or guarded against; at 80 bits of entropy
/// the risk is treated as negligible for a single-writer personal ledger.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Builds an `Id` from raw bytes, hex-encoding them. Does not enforce
    /// any particular length; callers that need the canonical 10-byte form
    /// should use `miser-crypto`'s generator.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let id = Id::from_bytes(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"deadbeef0001020304 05\"".replace(' ', ""));
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_hex_encoding() {
        let id = Id::from_bytes(&[0x01; 10]);
        assert_eq!(id.to_string(), "01010101010101010101");
        assert_eq!(id.as_str().len(), 20);
    }
}
