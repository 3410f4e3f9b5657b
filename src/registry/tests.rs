//! Cache-Backed Registry Tests
//!
//! Exercises the two-tier fallthrough order, self-healing repair, and the
//! write-authority rules against an in-memory store with injectable
//! failures. The SQLite-backed stores are covered in `store::tests`.

#[cfg(test)]
mod tests {
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::error::DirectoryError;
    use crate::registry::cache::{CacheBackedRegistry, RegistryStore};

    /// In-memory store double. `fail` makes every call return
    /// `Unavailable`; `reads` counts store-tier lookups; `on_insert`
    /// runs once inside the next store insert, after the row is written
    /// but before the call returns, to stage interleavings.
    struct MemoryStore {
        entries: DashMap<String, String>,
        fail: AtomicBool,
        reads: AtomicUsize,
        on_insert: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl MemoryStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                entries: DashMap::new(),
                fail: AtomicBool::new(false),
                reads: AtomicUsize::new(0),
                on_insert: Mutex::new(None),
            })
        }

        fn check(&self) -> Result<(), DirectoryError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DirectoryError::Unavailable("store offline".into()));
            }
            Ok(())
        }
    }

    impl RegistryStore<String> for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>, DirectoryError> {
            self.check()?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.get(key).map(|v| v.clone()))
        }

        fn insert(&self, key: &str, value: &String) -> Result<(), DirectoryError> {
            self.check()?;
            self.entries.insert(key.to_string(), value.clone());
            if let Some(hook) = self.on_insert.lock().unwrap().take() {
                hook();
            }
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<bool, DirectoryError> {
            self.check()?;
            Ok(self.entries.remove(key).is_some())
        }

        fn exists(&self, key: &str) -> Result<bool, DirectoryError> {
            self.check()?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.contains_key(key))
        }

        fn load_all(&self) -> Result<Vec<(String, String)>, DirectoryError> {
            self.check()?;
            Ok(self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect())
        }
    }

    #[test]
    fn test_insert_then_get_and_exists() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store);

        registry.insert("ds-1", "node-a".to_string()).unwrap();

        assert!(registry.exists("ds-1"));
        assert_eq!(registry.get("ds-1"), Some("node-a".to_string()));
        assert!(!registry.exists("ds-2"));
        assert_eq!(registry.get("ds-2"), None);
    }

    #[test]
    fn test_store_survives_cache_flush() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store);

        registry.insert("ds-1", "node-a".to_string()).unwrap();
        registry.flush_cache();

        // The store is the fallback of record: answers must not change.
        assert!(registry.exists("ds-1"));
        assert_eq!(registry.get("ds-1"), Some("node-a".to_string()));
    }

    #[test]
    fn test_store_hit_repairs_cache() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store.clone());

        registry.insert("ds-1", "node-a".to_string()).unwrap();
        registry.flush_cache();
        store.reads.store(0, Ordering::SeqCst);

        // First read falls through and repairs the cache.
        assert_eq!(registry.get("ds-1"), Some("node-a".to_string()));
        let after_miss = store.reads.load(Ordering::SeqCst);
        assert!(after_miss > 0, "miss should have reached the store");

        // Second read is a cache hit: no further store traffic.
        assert_eq!(registry.get("ds-1"), Some("node-a".to_string()));
        assert_eq!(store.reads.load(Ordering::SeqCst), after_miss);
    }

    #[test]
    fn test_exists_repairs_cache() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store.clone());

        registry.insert("ds-1", "node-a".to_string()).unwrap();
        registry.flush_cache();

        assert!(registry.exists("ds-1"));

        // The repair step populated the cache, so a store outage is now
        // invisible on this key.
        store.fail.store(true, Ordering::SeqCst);
        assert!(registry.exists("ds-1"));
        assert_eq!(registry.get("ds-1"), Some("node-a".to_string()));
    }

    #[test]
    fn test_store_error_is_absorbed_as_miss() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store.clone());

        store.fail.store(true, Ordering::SeqCst);

        // No cache entry and a failing store: reported as a miss, not a
        // panic or an error.
        assert!(!registry.exists("ds-1"));
        assert_eq!(registry.get("ds-1"), None);
    }

    #[test]
    fn test_insert_propagates_store_error() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store.clone());

        store.fail.store(true, Ordering::SeqCst);

        let err = registry.insert("ds-1", "node-a".to_string()).unwrap_err();
        assert!(err.is_transient(), "store write failure must propagate");

        // The failed write must not have leaked into the cache.
        store.fail.store(false, Ordering::SeqCst);
        assert!(!registry.exists("ds-1"));
    }

    #[test]
    fn test_remove_missing_key_is_not_found() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store);

        let err = registry.remove("ghost").unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[test]
    fn test_removal_racing_insert_leaves_no_stale_cache_entry() {
        let store = MemoryStore::new();
        let registry = Arc::new(CacheBackedRegistry::new("test", store.clone()));

        // Interleave a full removal between the insert's store write and
        // its cache write: the remove is the later store operation, so
        // the key must end up absent in both tiers.
        let racer = registry.clone();
        *store.on_insert.lock().unwrap() = Some(Box::new(move || {
            racer.remove("ds-1").unwrap();
        }));

        registry.insert("ds-1", "node-a".to_string()).unwrap();

        assert!(!registry.exists("ds-1"));
        assert_eq!(registry.get("ds-1"), None);
    }

    #[test]
    fn test_remove_deletes_both_tiers() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store);

        registry.insert("ds-1", "node-a".to_string()).unwrap();
        registry.remove("ds-1").unwrap();

        assert!(!registry.exists("ds-1"));
        assert_eq!(registry.get("ds-1"), None);
    }

    #[test]
    fn test_identifiers_unordered_scan() {
        let store = MemoryStore::new();
        let registry = CacheBackedRegistry::new("test", store);

        for i in 0..5 {
            registry
                .insert(&format!("ds-{i}"), "node-a".to_string())
                .unwrap();
        }

        let mut ids = registry.identifiers();
        ids.sort();
        assert_eq!(ids, vec!["ds-0", "ds-1", "ds-2", "ds-3", "ds-4"]);

        // After a flush the scan falls back to the store and still sees
        // every key.
        registry.flush_cache();
        let mut ids = registry.identifiers();
        ids.sort();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_warm_load_populates_cache() {
        let store = MemoryStore::new();
        store.entries.insert("ds-1".into(), "node-a".into());
        store.entries.insert("ds-2".into(), "node-b".into());

        let registry = CacheBackedRegistry::new("test", store.clone());

        // Warmed at construction: reads are cache hits.
        store.fail.store(true, Ordering::SeqCst);
        assert_eq!(registry.get("ds-1"), Some("node-a".to_string()));
        assert_eq!(registry.get("ds-2"), Some("node-b".to_string()));
        assert_eq!(registry.identifiers().len(), 2);
    }
}
