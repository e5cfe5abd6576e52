//! Catalog lookups kept in the cache tier.
//!
//! ```text
//! [Engine] → [RecommendationCache (L1, TTL)] → [Catalog API]
//! ```
//!
//! Every read failure is reported as a miss and every write failure is only
//! logged; the catalog stays the source of truth.

use crate::cache::{genres_key, get_json, set_json, CacheTier};
use crate::config::{TtlConfig, FALLBACK_PLAYLIST_ID_KEY, FALLBACK_TRACKS_KEY};
use crate::recommendations::types::RecommendationCandidate;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct RecommendationCache {
    tier: Arc<dyn CacheTier>,
    genres_ttl: Duration,
    fallback_tracks_ttl: Duration,
    fallback_playlist_ttl: Duration,
}

impl RecommendationCache {
    pub fn new(tier: Arc<dyn CacheTier>, ttl: &TtlConfig) -> Self {
        Self {
            tier,
            genres_ttl: ttl.genres(),
            fallback_tracks_ttl: ttl.fallback_tracks(),
            fallback_playlist_ttl: ttl.fallback_playlist_id(),
        }
    }

    /// Cached genre tags for an artist, keyed case-insensitively.
    pub async fn genres(&self, artist: &str) -> Option<Vec<String>> {
        let key = genres_key(artist);
        match get_json(self.tier.as_ref(), &key).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("Genre cache read failed for '{}': {}", artist, e);
                None
            }
        }
    }

    /// Empty tag lists are not stored so the next lookup retries the catalog.
    pub async fn set_genres(&self, artist: &str, genres: &[String]) {
        if genres.is_empty() {
            return;
        }
        let key = genres_key(artist);
        if let Err(e) = set_json(self.tier.as_ref(), &key, genres, self.genres_ttl).await {
            log::warn!("Genre cache write failed for '{}': {}", artist, e);
        }
    }

    pub async fn fallback_tracks(&self) -> Option<Vec<RecommendationCandidate>> {
        match get_json(self.tier.as_ref(), FALLBACK_TRACKS_KEY).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("Fallback track cache read failed: {}", e);
                None
            }
        }
    }

    pub async fn set_fallback_tracks(&self, tracks: &[RecommendationCandidate]) {
        if tracks.is_empty() {
            return;
        }
        if let Err(e) = set_json(
            self.tier.as_ref(),
            FALLBACK_TRACKS_KEY,
            tracks,
            self.fallback_tracks_ttl,
        )
        .await
        {
            log::warn!("Fallback track cache write failed: {}", e);
        }
    }

    /// Stored as a bare string, not JSON.
    pub async fn fallback_playlist_id(&self) -> Option<String> {
        match self.tier.get(FALLBACK_PLAYLIST_ID_KEY).await {
            Ok(hit) => hit.filter(|id| !id.trim().is_empty()),
            Err(e) => {
                log::warn!("Fallback playlist id cache read failed: {}", e);
                None
            }
        }
    }

    pub async fn set_fallback_playlist_id(&self, playlist_id: &str) {
        if let Err(e) = self
            .tier
            .set(FALLBACK_PLAYLIST_ID_KEY, playlist_id, self.fallback_playlist_ttl)
            .await
        {
            log::warn!("Fallback playlist id cache write failed: {}", e);
        }
    }
}
