use miser_core::Id;
use rand::RngCore;

/// Draws 10 bytes from the OS CSPRNG and hex-encodes them into an [`Id`].
/// Collisions are not checked for; at 80 bits of entropy the risk is
/// treated as negligible for a single-writer personal ledger.
pub fn generate_id() -> Id {
    let mut bytes = [0u8; 10];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Id::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_twenty_hex_characters() {
        let id = generate_id();
        assert_eq!(id.as_str().len(), 20);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn a_thousand_draws_do_not_collide() {
        let ids: HashSet<Id> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
