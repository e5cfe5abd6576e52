//! Recommendation engine implementation.
//!
//! Generates candidates for the next track by:
//! 1. Merging the listener's recently played and short/medium/long-term top tracks
//! 2. Falling back to a regional chart playlist when all of those are empty
//! 3. Either ranking by popularity, or keeping only tracks whose primary
//!    artist carries one of the requested genre tags
//!
//! Artist genre lookups are cached and run with a bounded number in flight.

use crate::cache::CacheTier;
use crate::config::{RecommendationConfig, TtlConfig};
use crate::providers::{Catalog, ProviderError, TimeRange};
use crate::recommendations::cache::RecommendationCache;
use crate::recommendations::errors::RecommendationError;
use crate::recommendations::types::RecommendationCandidate;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

pub struct RecommendationEngine {
    catalog: Arc<dyn Catalog>,
    cache: RecommendationCache,
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        cache: Arc<dyn CacheTier>,
        ttl: &TtlConfig,
        config: &RecommendationConfig,
    ) -> Self {
        Self {
            catalog,
            cache: RecommendationCache::new(cache, ttl),
            config: config.clone(),
        }
    }

    /// Ranked candidates for the listener owning `token`.
    ///
    /// With no genre tags the merged listening data is ranked by popularity.
    /// Otherwise only candidates whose primary artist has a genre containing
    /// one of the tags survive. At most `max_results` candidates are returned,
    /// unique by id and sorted by descending popularity.
    pub async fn recommend(
        &self,
        genre_tags: &[String],
        year_hint: Option<u16>,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, RecommendationError> {
        if token.trim().is_empty() {
            return Err(RecommendationError::MissingToken);
        }

        let mut candidates = self.gather(token).await;
        if candidates.is_empty() {
            log::info!("No listening data available, using regional fallback");
            candidates = self.regional_fallback(token).await;
        }

        let wanted: Vec<String> = genre_tags
            .iter()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();

        log::debug!(
            "Ranking {} candidates (genres: {:?}, year hint: {:?})",
            candidates.len(),
            wanted,
            year_hint
        );

        let selected = if wanted.is_empty() {
            candidates
        } else {
            self.filter_by_genre(candidates, &wanted, token).await
        };

        Ok(self.rank(selected))
    }

    /// Medium-term top tracks, used when recommendations came up empty.
    pub async fn top_tracks_fallback(
        &self,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, RecommendationError> {
        if token.trim().is_empty() {
            return Err(RecommendationError::MissingToken);
        }
        Ok(self.catalog.top_tracks(TimeRange::Medium, token).await?)
    }

    /// Genre tags of an artist, from the cache or the catalog.
    pub async fn artist_genres(
        &self,
        artist: &str,
        token: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let artist = artist.trim();
        if artist.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(genres) = self.cache.genres(artist).await {
            log::debug!("Genre cache hit for '{}'", artist);
            return Ok(genres);
        }

        let genres = self.catalog.artist_genres(artist, token).await?;
        self.cache.set_genres(artist, &genres).await;
        Ok(genres)
    }

    /// Recently played plus all three top-track ranges, fetched together.
    /// A failing list contributes nothing.
    async fn gather(&self, token: &str) -> Vec<RecommendationCandidate> {
        let (recent, short, medium, long) = tokio::join!(
            self.catalog.recently_played(token),
            self.catalog.top_tracks(TimeRange::Short, token),
            self.catalog.top_tracks(TimeRange::Medium, token),
            self.catalog.top_tracks(TimeRange::Long, token),
        );

        let lists = [
            ("recently_played", recent),
            (TimeRange::Short.as_str(), short),
            (TimeRange::Medium.as_str(), medium),
            (TimeRange::Long.as_str(), long),
        ];

        let mut merged = Vec::new();
        for (name, result) in lists {
            match result {
                Ok(tracks) => {
                    log::debug!("Fetched {} tracks from {}", tracks.len(), name);
                    merged.extend(tracks);
                }
                Err(e) => log::warn!("Failed to fetch {}: {}", name, e),
            }
        }
        log::info!("Merged {} candidate tracks from listening data", merged.len());
        merged
    }

    async fn regional_fallback(&self, token: &str) -> Vec<RecommendationCandidate> {
        match self.try_regional_fallback(token).await {
            Ok(tracks) => tracks,
            Err(e) => {
                log::warn!("Regional fallback unavailable: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_regional_fallback(
        &self,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, RecommendationError> {
        if let Some(tracks) = self.cache.fallback_tracks().await {
            log::debug!("Regional fallback served from cache ({} tracks)", tracks.len());
            return Ok(tracks);
        }

        let playlist_id = match self.cache.fallback_playlist_id().await {
            Some(id) => id,
            None => {
                let id = self.find_regional_playlist(token).await?;
                self.cache.set_fallback_playlist_id(&id).await;
                id
            }
        };

        let tracks = self.catalog.playlist_tracks(&playlist_id, token).await?;
        log::info!(
            "Fetched {} regional fallback tracks from playlist {}",
            tracks.len(),
            playlist_id
        );
        self.cache.set_fallback_tracks(&tracks).await;
        Ok(tracks)
    }

    /// Exact-name match owned by the configured account, both case-insensitive.
    async fn find_regional_playlist(&self, token: &str) -> Result<String, RecommendationError> {
        let query = self.config.regional_playlist_query.as_str();
        let owner = self.config.regional_playlist_owner.as_str();

        self.catalog
            .find_playlists(query, token)
            .await?
            .into_iter()
            .find(|p| p.name.trim().eq_ignore_ascii_case(query) && p.owner.eq_ignore_ascii_case(owner))
            .map(|p| p.id)
            .ok_or_else(|| RecommendationError::NoFallbackPlaylist(query.to_string()))
    }

    /// Keep candidates whose primary artist has a genre containing any wanted tag.
    ///
    /// Lookups run at most `genre_concurrency` at a time. A failed lookup drops
    /// only its own candidate.
    async fn filter_by_genre(
        &self,
        candidates: Vec<RecommendationCandidate>,
        wanted: &[String],
        token: &str,
    ) -> Vec<RecommendationCandidate> {
        let concurrency = self.config.genre_concurrency.max(1);

        let results: Vec<Option<RecommendationCandidate>> = stream::iter(candidates)
            .map(|mut candidate| async move {
                let artist = candidate.primary_artist().to_string();
                match self.artist_genres(&artist, token).await {
                    Ok(genres) => {
                        let matched = genres.iter().any(|genre| {
                            let genre = genre.to_lowercase();
                            wanted.iter().any(|tag| genre.contains(tag.as_str()))
                        });
                        if matched {
                            candidate.genres = genres;
                            Some(candidate)
                        } else {
                            None
                        }
                    }
                    Err(e) => {
                        log::debug!("Genre lookup failed for '{}': {}", artist, e);
                        None
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }

    /// Unique by id (first occurrence wins), most popular first, capped.
    fn rank(&self, candidates: Vec<RecommendationCandidate>) -> Vec<RecommendationCandidate> {
        let mut seen = HashSet::new();
        let mut unique: Vec<RecommendationCandidate> = candidates
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();

        unique.sort_by(|a, b| b.popularity_score().cmp(&a.popularity_score()));
        unique.truncate(self.config.max_results);
        unique
    }
}
