use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use miser_core::{Id, MiserError};
use miser_crypto::Cipher;
use miser_journal::{ItemKind, JournalSink, JournalSource, TagBinding};

/// In-memory projection of the tag-binding journal. Bindings are never
/// deleted once created, so `add` is idempotent on `(tag, item, kind)`
/// rather than latest-wins.
#[derive(Default)]
pub struct TagBindingRegistry {
    items: RwLock<HashMap<Id, TagBinding>>,
    pending: RwLock<Vec<TagBinding>>,
}

impl TagBindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, binding: TagBinding) -> usize {
        let mut items = self.items.write().unwrap();
        let already_bound = items.values().any(|b| {
            b.tag == binding.tag && b.item == binding.item && b.kind == binding.kind
        });
        if already_bound {
            return 0;
        }
        items.insert(binding.id.clone(), binding);
        1
    }

    pub fn enqueue(&self, binding: TagBinding) {
        self.pending.write().unwrap().push(binding);
    }

    pub fn items_for_tag(&self, tag: &Id) -> Vec<Id> {
        self.items
            .read()
            .unwrap()
            .values()
            .filter(|b| &b.tag == tag)
            .map(|b| b.item.clone())
            .collect()
    }

    /// Recovered from the original source's kind-filtered listing helper:
    /// items bound to `tag` restricted to a particular `ItemKind`.
    pub fn items_for_tag_kind(&self, tag: &Id, kind: ItemKind) -> Vec<Id> {
        self.items
            .read()
            .unwrap()
            .values()
            .filter(|b| &b.tag == tag && b.kind == kind)
            .map(|b| b.item.clone())
            .collect()
    }

    pub fn tags_for_item(&self, item: &Id) -> Vec<Id> {
        self.items
            .read()
            .unwrap()
            .values()
            .filter(|b| &b.item == item)
            .map(|b| b.tag.clone())
            .collect()
    }

    pub fn load(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::load(self, path, cipher)
    }

    pub fn save(&self, path: &Path, cipher: &Cipher) -> Result<usize, MiserError> {
        miser_journal::append(self, path, cipher)
    }
}

impl JournalSink<TagBinding> for TagBindingRegistry {
    fn add(&self, record: TagBinding) -> usize {
        TagBindingRegistry::add(self, record)
    }
}

impl JournalSource<TagBinding> for TagBindingRegistry {
    fn pending_flush(&self) -> Vec<TagBinding> {
        self.pending.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(id: &str, tag: &str, item: &str, kind: ItemKind) -> TagBinding {
        TagBinding { id: Id::from(id), tag: Id::from(tag), item: Id::from(item), kind }
    }

    #[test]
    fn items_for_tag_lists_every_bound_item() {
        let reg = TagBindingRegistry::new();
        reg.add(binding("tb1", "tag1", "item1", ItemKind::TransactionTag));
        reg.add(binding("tb2", "tag1", "item2", ItemKind::BalanceTag));
        let mut items = reg.items_for_tag(&Id::from("tag1"));
        items.sort();
        assert_eq!(items, vec![Id::from("item1"), Id::from("item2")]);
    }

    #[test]
    fn rebinding_the_same_triple_is_idempotent() {
        let reg = TagBindingRegistry::new();
        reg.add(binding("tb1", "tag1", "item1", ItemKind::TransactionTag));
        let result = reg.add(binding("tb2", "tag1", "item1", ItemKind::TransactionTag));
        assert_eq!(result, 0);
        assert_eq!(reg.items_for_tag(&Id::from("tag1")).len(), 1);
    }

    #[test]
    fn items_for_tag_kind_filters_by_kind() {
        let reg = TagBindingRegistry::new();
        reg.add(binding("tb1", "tag1", "tx1", ItemKind::TransactionTag));
        reg.add(binding("tb2", "tag1", "bal1", ItemKind::BalanceTag));
        assert_eq!(
            reg.items_for_tag_kind(&Id::from("tag1"), ItemKind::TransactionTag),
            vec![Id::from("tx1")]
        );
    }
}
