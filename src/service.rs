//! Entry point of the pipeline.
//!
//! ```text
//! resolve_track ─► [song:{id} L1] ─► [TrackStore L2] ─► [AudioResolver]
//!        │
//!        └─► PrefetchDispatcher (detached) ─► upnext:{next id}
//! ```
//!
//! Every successful resolution queues exactly one prefetch after the answer
//! is ready. The prefetch never changes the answer and is never awaited.

use crate::audio::AudioResolver;
use crate::cache::{get_json, set_json, song_key, up_next_key, CacheTier};
use crate::config::{ServiceConfig, EVICTION_INTERVAL_SECS};
use crate::credentials::CredentialRotator;
use crate::database::TrackStore;
use crate::errors::AppError;
use crate::models::{NextTrackPayload, ResolveParams, TrackHints, TrackRecord, UpNext};
use crate::prefetch::{PrefetchDispatcher, PrefetchOrchestrator, PrefetchOutcome};
use crate::providers::{AudioSource, Catalog, KeyProbe, VideoSearch};
use crate::recommendations::RecommendationEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// External services the pipeline talks to.
pub struct Collaborators {
    pub audio_source: Arc<dyn AudioSource>,
    pub catalog: Arc<dyn Catalog>,
    pub search: Arc<dyn VideoSearch>,
    pub key_probe: Arc<dyn KeyProbe>,
    pub cache: Arc<dyn CacheTier>,
    pub store: Arc<dyn TrackStore>,
}

pub struct SongService {
    cache: Arc<dyn CacheTier>,
    store: Arc<dyn TrackStore>,
    resolver: Arc<AudioResolver>,
    engine: Arc<RecommendationEngine>,
    credentials: Arc<CredentialRotator>,
    orchestrator: Arc<PrefetchOrchestrator>,
    dispatcher: PrefetchDispatcher,
    placeholder_url: String,
    song_ttl: Duration,
    record_ttl: Duration,
}

impl SongService {
    /// Wire up every component. Starts the prefetch worker, so this must run
    /// inside a tokio runtime.
    pub fn new(config: &ServiceConfig, deps: Collaborators) -> Self {
        let resolver = Arc::new(AudioResolver::new(deps.audio_source, &config.audio));
        let engine = Arc::new(RecommendationEngine::new(
            deps.catalog,
            deps.cache.clone(),
            &config.ttl,
            &config.recommendations,
        ));
        let credentials = Arc::new(CredentialRotator::new(
            config.api_keys.clone(),
            deps.key_probe,
        ));
        let orchestrator = Arc::new(PrefetchOrchestrator::new(
            engine.clone(),
            resolver.clone(),
            deps.search,
            credentials.clone(),
            deps.store.clone(),
            deps.cache.clone(),
            config,
        ));
        let dispatcher = PrefetchDispatcher::start(orchestrator.clone());

        log::info!(
            "Song service ready ({} API keys, formats {:?})",
            config.api_keys.len(),
            config.audio.preferred_formats
        );

        Self {
            cache: deps.cache,
            store: deps.store,
            resolver,
            engine,
            credentials,
            orchestrator,
            dispatcher,
            placeholder_url: config.placeholder_url.clone(),
            song_ttl: config.ttl.song(),
            record_ttl: config.ttl.record(),
        }
    }

    /// Playable record for a content id, via cache, store or a fresh resolution.
    pub async fn resolve_track(&self, params: &ResolveParams) -> Result<TrackRecord, AppError> {
        let content_id = params.content_id.trim();
        if content_id.is_empty() {
            return Err(AppError::Validation("content id is required".to_string()));
        }

        if let Some(record) = self.cached_record(content_id).await {
            log::debug!("Cache hit for '{}'", content_id);
            self.schedule_prefetch(content_id, params);
            return Ok(record);
        }

        if let Some(mut record) = self.store.find(content_id).await? {
            if record.audio_url == self.placeholder_url {
                log::info!("Stored record for '{}' has no audio yet, resolving", content_id);
                let audio = self.resolver.resolve(content_id).await?;
                record.refresh_audio(audio, self.record_ttl);
                self.store.upsert(&record).await?;
            } else {
                log::debug!("Store hit for '{}'", content_id);
            }

            self.cache_record(&record).await;
            self.schedule_prefetch(content_id, params);
            return Ok(record);
        }

        log::info!("Cache miss for '{}', resolving from source", content_id);
        let audio = self.resolver.resolve(content_id).await?;
        let catalog_genres = self
            .primary_artist_genres(&params.hints, params.catalog_token.as_deref())
            .await;

        let record = TrackRecord::from_hints(
            content_id,
            &params.hints,
            audio,
            catalog_genres,
            self.record_ttl,
        );
        self.store.upsert(&record).await?;
        self.cache_record(&record).await;
        self.schedule_prefetch(content_id, params);

        Ok(record)
    }

    /// Compute the successor in the caller's task. Failures read as `None`.
    pub async fn fetch_next(
        &self,
        content_id: &str,
        hints: &TrackHints,
        token: Option<&str>,
    ) -> Option<NextTrackPayload> {
        self.orchestrator.fetch_next(content_id, hints, token).await
    }

    /// Whether the successor of `content_id` is prepared yet.
    pub async fn peek_up_next(&self, content_id: &str) -> Result<UpNext, AppError> {
        let content_id = content_id.trim();
        if content_id.is_empty() {
            return Err(AppError::Validation("content id is required".to_string()));
        }

        let next_id = match self.store.find(content_id).await? {
            Some(TrackRecord {
                next_content_id: Some(next_id),
                ..
            }) => next_id,
            _ => return Ok(UpNext::Pending),
        };

        match get_json::<NextTrackPayload>(self.cache.as_ref(), &up_next_key(&next_id)).await {
            Ok(Some(payload)) => Ok(UpNext::Ready(payload)),
            Ok(None) => Ok(UpNext::Pending),
            Err(e) => {
                log::warn!("Up-next cache read failed for '{}': {}", next_id, e);
                Ok(UpNext::Pending)
            }
        }
    }

    pub fn subscribe_prefetch(&self) -> broadcast::Receiver<PrefetchOutcome> {
        self.dispatcher.subscribe()
    }

    pub fn credentials(&self) -> &CredentialRotator {
        &self.credentials
    }

    /// Remove expired records from the store now.
    pub async fn evict_expired(&self) -> Result<u64, AppError> {
        let removed = self.store.evict_expired().await?;
        if removed > 0 {
            log::info!("Evicted {} expired track records", removed);
        }
        Ok(removed)
    }

    /// Sweep expired records in the background at a fixed interval.
    pub fn start_maintenance(&self) -> JoinHandle<()> {
        let store = self.store.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(EVICTION_INTERVAL_SECS));
            loop {
                ticker.tick().await;
                match store.evict_expired().await {
                    Ok(0) => {}
                    Ok(removed) => log::info!("Evicted {} expired track records", removed),
                    Err(e) => log::warn!("Track eviction failed: {}", e),
                }
            }
        })
    }

    async fn cached_record(&self, content_id: &str) -> Option<TrackRecord> {
        match get_json(self.cache.as_ref(), &song_key(content_id)).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("Cache read failed for '{}': {}", content_id, e);
                None
            }
        }
    }

    async fn cache_record(&self, record: &TrackRecord) {
        if let Err(e) = set_json(
            self.cache.as_ref(),
            &song_key(&record.content_id),
            record,
            self.song_ttl,
        )
        .await
        {
            log::warn!("Cache write failed for '{}': {}", record.content_id, e);
        }
    }

    async fn primary_artist_genres(&self, hints: &TrackHints, token: Option<&str>) -> Vec<String> {
        let (Some(artist), Some(token)) = (hints.artists.first(), token) else {
            return Vec::new();
        };

        match self.engine.artist_genres(artist, token).await {
            Ok(genres) => genres,
            Err(e) => {
                log::debug!("Genre lookup failed for '{}': {}", artist, e);
                Vec::new()
            }
        }
    }

    fn schedule_prefetch(&self, content_id: &str, params: &ResolveParams) {
        self.dispatcher
            .dispatch(content_id, &params.hints, params.catalog_token.as_deref());
    }
}
