use ahash::AHashMap;
use bizrec_core::{CacheKey, RecommendationItem, Result};
use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Key/value byte store with per-entry expiry.
///
/// Implementations report backend failures as `Error::Upstream`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    /// Returns whether an entry was removed.
    fn delete(&self, key: &str) -> Result<bool>;
}

impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process [`CacheStore`]. Expired entries are dropped lazily on read and
/// by [`MemoryCacheStore::purge_expired`].
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<AHashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }
}

/// Typed cache of recommendation responses, stored as JSON.
pub struct ResponseCache<S> {
    store: S,
    ttl: Duration,
}

impl<S: CacheStore> ResponseCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cached items for `key`. A value that no longer decodes is dropped and
    /// reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Vec<RecommendationItem>>> {
        let Some(bytes) = self.store.get(key.as_str())? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(items) => Ok(Some(items)),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                if let Err(e) = self.store.delete(key.as_str()) {
                    tracing::warn!("Failed to delete cache entry {}: {}", key, e);
                }
                Ok(None)
            }
        }
    }

    /// Raw serialized value, as stored.
    pub fn get_raw(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        self.store.get(key.as_str())
    }

    pub fn set(&self, key: &CacheKey, items: &[RecommendationItem]) -> Result<()> {
        let bytes = serde_json::to_vec(items)?;
        self.store.set(key.as_str(), bytes, self.ttl)
    }

    pub fn delete(&self, key: &CacheKey) -> Result<bool> {
        self.store.delete(key.as_str())
    }
}
