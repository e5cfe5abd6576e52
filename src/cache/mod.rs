//! Fast key/value tier (L1) with per-key TTL and bounded lists.
//!
//! The cache is never authoritative: any entry may vanish at any time and
//! callers must fall through to the persistent store.
//!
//! ```text
//! [Request] → [CacheTier] → [TrackStore] → [AudioResolver]
//! ```

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A list operation hit a plain value, or the reverse
    #[error("Wrong value type at key '{0}'")]
    WrongType(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<CacheError> for crate::errors::AppError {
    fn from(e: CacheError) -> Self {
        crate::errors::AppError::Cache(e.to_string())
    }
}

/// Pass-through key/value store. Implementations never recompute values.
#[async_trait]
pub trait CacheTier: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Push to the front of the list at `key`, creating it if needed.
    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Inclusive range; negative indices count from the end.
    async fn list_range(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<String>, CacheError>;

    /// Keep only the inclusive range, dropping everything else.
    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> Result<(), CacheError>;
}

/// Read and decode a JSON value. Undecodable entries read as a miss.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheTier,
    key: &str,
) -> Result<Option<T>, CacheError> {
    let Some(raw) = cache.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("Discarding undecodable cache entry '{}': {}", key, e);
            Ok(None)
        }
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn CacheTier,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw, ttl).await
}

pub fn song_key(content_id: &str) -> String {
    format!("song:{}", content_id)
}

pub fn up_next_key(content_id: &str) -> String {
    format!("upnext:{}", content_id)
}

pub fn genres_key(artist: &str) -> String {
    format!("genres:{}", artist.trim().to_lowercase())
}

/// Resolve Redis-style inclusive list bounds against a list of `len` items.
///
/// Returns `None` when the range selects nothing.
pub(crate) fn normalize_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as isize;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };

    if start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}
