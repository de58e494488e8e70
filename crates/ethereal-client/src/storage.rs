//! Client-side storage for locally sealed envelopes

use std::collections::HashMap;

/// Key/value storage for sealed envelopes, the analogue of a browser's
/// `sessionStorage`. Only serialized envelopes are ever written.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, name: &str) -> Option<String>;
    fn set_item(&mut self, name: &str, value: String);
    fn remove_item(&mut self, name: &str);
}

/// Process-local storage, dropped with the client.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, name: &str) -> Option<String> {
        self.items.get(name).cloned()
    }

    fn set_item(&mut self, name: &str, value: String) {
        self.items.insert(name.to_string(), value);
    }

    fn remove_item(&mut self, name: &str) {
        self.items.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut storage = MemoryStorage::new();
        assert!(storage.is_empty());
        storage.set_item("a", "1".into());
        storage.set_item("a", "2".into());
        assert_eq!(storage.get_item("a").as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);
        storage.remove_item("a");
        storage.remove_item("a");
        assert_eq!(storage.get_item("a"), None);
    }
}
