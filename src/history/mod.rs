//! Recently chosen next-track titles, kept in the cache tier.
//!
//! One global list shared by every listener. Newest entries are at the front
//! and the list never grows past its capacity.

use crate::cache::{CacheError, CacheTier};
use std::sync::Arc;

#[derive(Clone)]
pub struct HistoryTracker {
    cache: Arc<dyn CacheTier>,
    key: String,
    capacity: usize,
}

impl HistoryTracker {
    pub fn new(cache: Arc<dyn CacheTier>, key: &str, capacity: usize) -> Self {
        Self {
            cache,
            key: key.to_string(),
            capacity: capacity.max(1),
        }
    }

    /// Push `title` to the front, dropping the oldest entries beyond capacity.
    pub async fn record(&self, title: &str) -> Result<(), CacheError> {
        self.cache.list_push(&self.key, title).await?;
        self.cache
            .list_trim(&self.key, 0, self.capacity as isize - 1)
            .await?;
        log::debug!("Recorded '{}' in play history", title);
        Ok(())
    }

    /// Most recent first. A cache failure reads as an empty history.
    pub async fn recent(&self) -> Vec<String> {
        match self
            .cache
            .list_range(&self.key, 0, self.capacity as isize - 1)
            .await
        {
            Ok(titles) => titles,
            Err(e) => {
                log::warn!("Failed to read play history: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn tracker(capacity: usize) -> HistoryTracker {
        HistoryTracker::new(Arc::new(MemoryCache::new()), "history", capacity)
    }

    #[tokio::test]
    async fn test_newest_first() {
        let history = tracker(5);
        history.record("one").await.unwrap();
        history.record("two").await.unwrap();
        assert_eq!(history.recent().await, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn test_oldest_is_evicted_at_capacity() {
        let history = tracker(5);
        for title in ["a", "b", "c", "d", "e", "f"] {
            history.record(title).await.unwrap();
        }

        let recent = history.recent().await;
        assert_eq!(recent, vec!["f", "e", "d", "c", "b"]);
        assert!(!recent.contains(&"a".to_string()));
    }

    #[tokio::test]
    async fn test_length_never_exceeds_capacity() {
        let cache = Arc::new(MemoryCache::new());
        let history = HistoryTracker::new(cache.clone(), "history", 3);
        for i in 0..10 {
            history.record(&format!("song {}", i)).await.unwrap();
            let stored = cache.list_range("history", 0, -1).await.unwrap();
            assert!(stored.len() <= 3);
        }
    }

    #[tokio::test]
    async fn test_wrong_type_reads_as_empty() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set("history", "not a list", std::time::Duration::from_secs(60))
            .await
            .unwrap();
        let history = HistoryTracker::new(cache, "history", 5);
        assert!(history.recent().await.is_empty());
    }
}
