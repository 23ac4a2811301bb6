use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::error::CacheError;

/// Key-value store for computed responses. Failures are treated as a miss by callers.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// Cache that never stores anything.
pub struct NoopCache;

#[async_trait]
impl ResultCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

struct CacheEntry {
    value: Vec<u8>,
    /// insertion order, used for eviction
    seq: u64,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

/// In-process cache with per-entry TTL. When full, the oldest entry is evicted.
pub struct MemoryResultCache {
    state: RwLock<CacheState>,
    max_entries: usize,
}

impl MemoryResultCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.entries.retain(|_, e| e.expires_at > now);

        if state.entries.len() >= self.max_entries && !state.entries.contains_key(key) {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                seq,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

/// SHA-256 hex of the endpoint name and the serialized normalized request.
pub fn cache_key<T: Serialize>(endpoint: &str, normalized: &T) -> Result<String, CacheError> {
    let payload = serde_json::to_vec(normalized).map_err(|e| CacheError::Backend(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(b"\n");
    hasher.update(&payload);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Cached value for `key`; any failure or corrupt entry is a miss.
pub async fn load<T: DeserializeOwned>(cache: &dyn ResultCache, key: &str) -> Option<T> {
    let bytes = match cache.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("cache read failed for {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => {
            tracing::debug!("cache hit {}", key);
            Some(value)
        }
        Err(e) => {
            let e = CacheError::Corrupt(e.to_string());
            tracing::warn!("ignoring cache entry {}: {}", key, e);
            None
        }
    }
}

/// Stores `value` under `key`; failures are logged and swallowed.
pub async fn store<T: Serialize>(cache: &dyn ResultCache, key: &str, value: &T, ttl: Duration) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("cache serialization failed for {}: {}", key, e);
            return;
        }
    };
    if let Err(e) = cache.set(key, bytes, ttl).await {
        tracing::warn!("cache write failed for {}: {}", key, e);
    }
}
