use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::DirectoryError;

/// Durable tier behind a [`CacheBackedRegistry`].
///
/// `insert` has upsert semantics; `remove` reports whether a row was
/// actually affected so the registry can surface "not found" instead of
/// silently ignoring it.
pub trait RegistryStore<V>: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<V>, DirectoryError>;
    fn insert(&self, key: &str, value: &V) -> Result<(), DirectoryError>;
    fn remove(&self, key: &str) -> Result<bool, DirectoryError>;
    fn exists(&self, key: &str) -> Result<bool, DirectoryError>;
    fn load_all(&self) -> Result<Vec<(String, V)>, DirectoryError>;
}

/// Low-latency cache over a persistent [`RegistryStore`].
///
/// On construction the registry tries to warm the cache with the store's
/// full contents; if that succeeds, write-through keeps the cache complete
/// and `identifiers` can be served without touching the store. If warming
/// fails the registry degrades to store scans and logs the reason.
pub struct CacheBackedRegistry<V> {
    name: &'static str,
    cache: DashMap<String, V>,
    store: Arc<dyn RegistryStore<V>>,
    warmed: AtomicBool,

    /// Bumped by every successful `remove`. `insert` compares it around
    /// its store write so a removal interleaving between the store write
    /// and the cache write cannot leave a stale cache entry behind.
    removals: AtomicU64,
}

impl<V: Clone + Send + Sync + 'static> CacheBackedRegistry<V> {
    pub fn new(name: &'static str, store: Arc<dyn RegistryStore<V>>) -> Self {
        let registry = Self {
            name,
            cache: DashMap::new(),
            store,
            warmed: AtomicBool::new(false),
            removals: AtomicU64::new(0),
        };
        registry.warm();
        registry
    }

    fn warm(&self) {
        match self.store.load_all() {
            Ok(entries) => {
                for (key, value) in entries {
                    self.cache.insert(key, value);
                }
                self.warmed.store(true, Ordering::Release);
                tracing::info!(
                    registry = self.name,
                    entries = self.cache.len(),
                    "cache warmed from store"
                );
            }
            Err(e) => {
                tracing::warn!(
                    registry = self.name,
                    "cache warm failed, serving scans from store: {e}"
                );
            }
        }
    }

    /// Two-tier existence check. A store-tier hit repairs the cache
    /// before returning. Store errors on this read path are absorbed and
    /// reported as a miss, since `exists` has no error channel.
    pub fn exists(&self, key: &str) -> bool {
        if self.cache.contains_key(key) {
            return true;
        }

        match self.store.exists(key) {
            Ok(true) => {
                self.repair(key);
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::error!(registry = self.name, key, "store existence check failed: {e}");
                false
            }
        }
    }

    /// Two-tier read. A value found only in the store is written back
    /// into the cache.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.cache.get(key) {
            return Some(value.clone());
        }

        match self.store.get(key) {
            Ok(Some(value)) => {
                self.cache.insert(key.to_string(), value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(registry = self.name, key, "store read failed: {e}");
                None
            }
        }
    }

    /// Write-through insert. The store write is authoritative; only after
    /// it succeeds does the cache learn the value. A `remove` racing this
    /// call may delete the key from the store before our cache write
    /// lands; the removal counter detects that interleaving and the cache
    /// entry is dropped again instead of left stale.
    pub fn insert(&self, key: &str, value: V) -> Result<(), DirectoryError> {
        let removals = self.removals.load(Ordering::SeqCst);
        self.store.insert(key, &value)?;
        self.cache.insert(key.to_string(), value);

        if self.removals.load(Ordering::SeqCst) != removals {
            self.cache.remove(key);
        }
        Ok(())
    }

    /// Store-authoritative removal. Zero affected rows is reported as
    /// `NotFound`, not silently ignored. The counter bump must precede
    /// the cache removal so a concurrent `insert` either sees the bump or
    /// has its cache write deleted here.
    pub fn remove(&self, key: &str) -> Result<(), DirectoryError> {
        let affected = self.store.remove(key)?;
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.cache.remove(key);

        if !affected {
            return Err(DirectoryError::NotFound(format!(
                "{}: key '{key}' was not present",
                self.name
            )));
        }
        Ok(())
    }

    /// Unordered key scan. Served from the cache when it is known to be
    /// complete, else from a full store scan.
    pub fn identifiers(&self) -> Vec<String> {
        if self.warmed.load(Ordering::Acquire) {
            return self.cache.iter().map(|e| e.key().clone()).collect();
        }

        match self.store.load_all() {
            Ok(entries) => entries.into_iter().map(|(key, _)| key).collect(),
            Err(e) => {
                tracing::error!(registry = self.name, "store scan failed: {e}");
                Vec::new()
            }
        }
    }

    /// Drops every cached entry. The store remains intact; subsequent
    /// reads repopulate the cache lazily.
    pub fn flush_cache(&self) {
        self.cache.clear();
        self.warmed.store(false, Ordering::Release);
    }

    fn repair(&self, key: &str) {
        match self.store.get(key) {
            Ok(Some(value)) => {
                self.cache.insert(key.to_string(), value);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(registry = self.name, key, "cache repair failed: {e}");
            }
        }
    }
}
