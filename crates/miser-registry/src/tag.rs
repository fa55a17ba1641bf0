use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use miser_core::{Id, MiserError};
use miser_crypto::Cipher;
use miser_journal::{JournalSink, JournalSource, Tag};

/// In-memory projection of the tags journal. `name` is plaintext in memory
/// (see `miser_crypto::EncryptedString`), so `get_by_name` needs no key.
#[derive(Default)]
pub struct TagRegistry {
    items: RwLock<HashMap<Id, Tag>>,
    pending: RwLock<Vec<Tag>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tag: Tag) -> usize {
        let mut items = self.items.write().unwrap();
        let existed = items.contains_key(&tag.id);
        if tag.deleted && !existed {
            return 0;
        }
        items.insert(tag.id.clone(), tag);
        1
    }

    pub fn enqueue(&self, tag: Tag) {
        self.pending.write().unwrap().push(tag);
    }

    pub fn get(&self, id: &Id) -> Option<Tag> {
        self.items.read().unwrap().get(id).filter(|t| !t.deleted).cloned()
    }

    /// Names need not be unique across time; the first visible match wins.
    pub fn get_by_name(&self, name: &str) -> Option<Tag> {
        self.items
            .read()
            .unwrap()
            .values()
            .find(|t| !t.deleted && t.name.as_str() == name)
            .cloned()
    }

    /// Returns the existing tag named `name`, or creates and registers a
    /// fresh one if none exists yet. Used for the small set of system tags
    /// (e.g. `Initial`) that are created lazily on first use.
    pub fn get_or_create(&self, name: &str, new_id: impl FnOnce() -> Id) -> Tag {
        if let Some(existing) = self.get_by_name(name) {
            return existing;
        }
        let tag = Tag::new(new_id(), name);
        self.add(tag.clone());
        self.enqueue(tag.clone());
        tag
    }

    pub fn load(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::load(self, path, cipher)
    }

    pub fn save(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::append(self, path, cipher)
    }
}

impl JournalSink<Tag> for TagRegistry {
    fn add(&self, record: Tag) -> usize {
        TagRegistry::add(self, record)
    }
}

impl JournalSource<Tag> for TagRegistry {
    fn pending_flush(&self) -> Vec<Tag> {
        self.pending.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_creates_once_and_reuses_afterwards() {
        let reg = TagRegistry::new();
        let first = reg.get_or_create("Initial", || Id::from("tag1"));
        let second = reg.get_or_create("Initial", || Id::from("should-not-be-used"));
        assert_eq!(first.id, second.id);
    }
}
