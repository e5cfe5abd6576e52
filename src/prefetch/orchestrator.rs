use crate::audio::{AudioResolveError, AudioResolver};
use crate::cache::{set_json, up_next_key, CacheError, CacheTier};
use crate::config::{
    ServiceConfig, FALLBACK_TRACK_ARTIST, FALLBACK_TRACK_ID, FALLBACK_TRACK_TITLE, HISTORY_KEY,
};
use crate::credentials::{CredentialError, CredentialRotator, CredentialState};
use crate::database::TrackStore;
use crate::errors::AppError;
use crate::history::HistoryTracker;
use crate::models::{NextTrackPayload, TrackHints};
use crate::providers::{ProviderError, VideoSearch};
use crate::recommendations::{RecommendationCandidate, RecommendationEngine};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefetchError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("Video search failed: {0}")]
    Search(ProviderError),

    #[error("No search result for '{0}'")]
    NoSearchResult(String),

    #[error(transparent)]
    Audio(#[from] AudioResolveError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] AppError),
}

/// The track picked to follow the current one, before it has a content id.
#[derive(Debug, Clone)]
struct NextChoice {
    title: String,
    artist: String,
    thumbnail: String,
    genre: String,
    album: String,
    /// Known up front only for the sentinel track
    content_id: Option<String>,
}

impl NextChoice {
    fn sentinel() -> Self {
        Self {
            title: FALLBACK_TRACK_TITLE.to_string(),
            artist: FALLBACK_TRACK_ARTIST.to_string(),
            thumbnail: String::new(),
            genre: "Unknown".to_string(),
            album: String::new(),
            content_id: Some(FALLBACK_TRACK_ID.to_string()),
        }
    }
}

impl From<RecommendationCandidate> for NextChoice {
    fn from(c: RecommendationCandidate) -> Self {
        Self {
            genre: c.genres.first().cloned().unwrap_or_else(|| "Unknown".to_string()),
            title: c.title,
            artist: c.artist,
            thumbnail: c.thumbnail.unwrap_or_default(),
            album: c.album.unwrap_or_default(),
            content_id: None,
        }
    }
}

/// Works out and prepares the track most likely to be requested next.
pub struct PrefetchOrchestrator {
    engine: Arc<RecommendationEngine>,
    resolver: Arc<AudioResolver>,
    search: Arc<dyn VideoSearch>,
    credentials: Arc<CredentialRotator>,
    store: Arc<dyn TrackStore>,
    cache: Arc<dyn CacheTier>,
    history: HistoryTracker,
    up_next_ttl: Duration,
}

impl PrefetchOrchestrator {
    pub fn new(
        engine: Arc<RecommendationEngine>,
        resolver: Arc<AudioResolver>,
        search: Arc<dyn VideoSearch>,
        credentials: Arc<CredentialRotator>,
        store: Arc<dyn TrackStore>,
        cache: Arc<dyn CacheTier>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            history: HistoryTracker::new(cache.clone(), HISTORY_KEY, config.history_capacity),
            up_next_ttl: config.ttl.up_next(),
            engine,
            resolver,
            search,
            credentials,
            store,
            cache,
        }
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    /// Prepare the successor of `content_id`. Failures are logged, never returned.
    pub async fn fetch_next(
        &self,
        content_id: &str,
        hints: &TrackHints,
        token: Option<&str>,
    ) -> Option<NextTrackPayload> {
        match self.try_fetch_next(content_id, hints, token).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("Prefetch after '{}' failed: {}", content_id, e);
                None
            }
        }
    }

    /// On success the payload is cached under the new id, its title joins the
    /// history and the current record points at it.
    pub async fn try_fetch_next(
        &self,
        content_id: &str,
        hints: &TrackHints,
        token: Option<&str>,
    ) -> Result<NextTrackPayload, PrefetchError> {
        let recent = self.history.recent().await;
        let choice = self.choose(content_id, hints, token, &recent).await;

        let next_id = match &choice.content_id {
            Some(id) => id.clone(),
            None => self.search_content_id(&choice).await?,
        };

        let audio = self.resolver.resolve(&next_id).await?;
        let payload = NextTrackPayload {
            content_id: next_id.clone(),
            title: choice.title,
            artist: choice.artist,
            thumbnail: choice.thumbnail,
            genre: choice.genre,
            album: choice.album,
            audio,
        };

        self.history.record(&payload.title).await?;
        set_json(
            self.cache.as_ref(),
            &up_next_key(&next_id),
            &payload,
            self.up_next_ttl,
        )
        .await?;

        if !self.store.set_successor(content_id, &next_id).await? {
            log::debug!("No live record for '{}' to link to '{}'", content_id, next_id);
        }

        log::info!(
            "Prefetched '{}' by {} ({}) after '{}'",
            payload.title,
            payload.artist,
            next_id,
            content_id
        );
        Ok(payload)
    }

    /// Recommendation → medium-term top track → sentinel, skipping recent titles.
    async fn choose(
        &self,
        content_id: &str,
        hints: &TrackHints,
        token: Option<&str>,
        recent: &[String],
    ) -> NextChoice {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            log::debug!("No catalog token for '{}', using fallback track", content_id);
            return NextChoice::sentinel();
        };

        let genre_tags = match self.store.find(content_id).await {
            Ok(Some(record)) => record.catalog_genres,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Could not read record for '{}': {}", content_id, e);
                Vec::new()
            }
        };

        match self.engine.recommend(&genre_tags, hints.release_year, token).await {
            Ok(candidates) => {
                if let Some(pick) = pick_unplayed(candidates, recent) {
                    return pick.into();
                }
            }
            Err(e) => log::warn!("Recommendations unavailable: {}", e),
        }

        match self.engine.top_tracks_fallback(token).await {
            Ok(tracks) => {
                if let Some(pick) = pick_unplayed(tracks, recent) {
                    log::debug!("Falling back to top track '{}'", pick.title);
                    return pick.into();
                }
            }
            Err(e) => log::warn!("Top tracks fallback unavailable: {}", e),
        }

        log::info!("No recommendation survived for '{}', using fallback track", content_id);
        NextChoice::sentinel()
    }

    async fn search_content_id(&self, choice: &NextChoice) -> Result<String, PrefetchError> {
        let query = format!("{} {} official audio", choice.title, choice.artist);
        let api_key = self.credentials.next().await?;

        match self.search.search(&query, &api_key).await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(PrefetchError::NoSearchResult(query)),
            Err(e) => {
                if e.is_credential_failure() {
                    let state = if e == ProviderError::QuotaExceeded {
                        CredentialState::Exhausted
                    } else {
                        CredentialState::Invalid
                    };
                    self.credentials.mark_terminal(&api_key, state);
                }
                Err(PrefetchError::Search(e))
            }
        }
    }
}

/// Uniformly random candidate whose title is not in `recent`.
fn pick_unplayed(
    candidates: Vec<RecommendationCandidate>,
    recent: &[String],
) -> Option<RecommendationCandidate> {
    let mut fresh: Vec<RecommendationCandidate> = candidates
        .into_iter()
        .filter(|c| !recent.contains(&c.title))
        .collect();

    if fresh.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..fresh.len());
    Some(fresh.swap_remove(index))
}
