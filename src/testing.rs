//! In-process stand-ins for the external collaborators, used by unit tests.

use crate::providers::{
    AudioSource, Catalog, FormatDescriptor, KeyProbe, PlaylistRef, ProbeOutcome, ProviderError,
    TimeRange, VideoSearch,
};
use crate::recommendations::types::RecommendationCandidate;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn candidate(
    id: &str,
    title: &str,
    artist: &str,
    popularity: Option<u32>,
) -> RecommendationCandidate {
    RecommendationCandidate {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: Some(format!("{} album", title)),
        thumbnail: Some(format!("https://i.scdn.co/image/{}", id)),
        popularity,
        genres: Vec::new(),
        release_year: None,
        duration_ms: Some(180_000),
    }
}

/// Audio source that only answers for configured formats.
#[derive(Default)]
pub struct StubAudioSource {
    succeed: HashSet<String>,
    flaky: Mutex<HashSet<String>>,
    overrides: HashMap<String, String>,
    formats: Vec<FormatDescriptor>,
    calls: Mutex<Vec<(String, String)>>,
    list_calls: AtomicUsize,
}

impl StubAudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed_on(mut self, format: &str) -> Self {
        self.succeed.insert(format.to_string());
        self
    }

    /// Time out on the first request for `format`, then succeed.
    pub fn flaky_on(self, format: &str) -> Self {
        self.flaky.lock().insert(format.to_string());
        self.succeed_on(format)
    }

    /// Return `raw` verbatim for `format`.
    pub fn respond_with(mut self, format: &str, raw: &str) -> Self {
        self.overrides.insert(format.to_string(), raw.to_string());
        self
    }

    pub fn with_formats(mut self, formats: Vec<FormatDescriptor>) -> Self {
        self.formats = formats;
        self
    }

    pub fn url_for(content_id: &str, format: &str) -> String {
        format!(
            "https://rr1---sn-stub.googlevideo.com/videoplayback?id={}&itag={}",
            content_id, format
        )
    }

    /// Formats requested so far, across all content ids.
    pub fn resolve_calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, f)| f.clone()).collect()
    }

    pub fn resolve_calls_for(&self, content_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(id, _)| id == content_id)
            .map(|(_, f)| f.clone())
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSource for StubAudioSource {
    async fn resolve(&self, content_id: &str, format: &str) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .push((content_id.to_string(), format.to_string()));

        if self.flaky.lock().remove(format) {
            return Err(ProviderError::NetworkError("request timed out".to_string()));
        }
        if let Some(raw) = self.overrides.get(format) {
            return Ok(raw.clone());
        }
        if self.succeed.contains(format) {
            return Ok(Self::url_for(content_id, format));
        }
        Err(ProviderError::ProcessError(format!(
            "requested format {} is not available",
            format
        )))
    }

    async fn list_formats(&self, _content_id: &str) -> Result<Vec<FormatDescriptor>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.formats.clone())
    }
}

/// Key probe with scripted outcomes; unknown keys are valid.
#[derive(Default)]
pub struct StubProbe {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<String>>,
}

impl StubProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, outcome: ProbeOutcome) -> Self {
        self.set(key, outcome);
        self
    }

    /// Hold every probe until a permit is added to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set(&self, key: &str, outcome: ProbeOutcome) {
        self.outcomes.lock().insert(key.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl KeyProbe for StubProbe {
    async fn probe(&self, api_key: &str) -> ProbeOutcome {
        self.calls.lock().push(api_key.to_string());
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.outcomes
            .lock()
            .get(api_key)
            .copied()
            .unwrap_or(ProbeOutcome::Valid)
    }
}

/// Catalog with canned lists. Lists default to empty; unknown artists have no genres.
#[derive(Default)]
pub struct StubCatalog {
    recent: Option<Vec<RecommendationCandidate>>,
    recent_fails: bool,
    top: HashMap<TimeRange, Vec<RecommendationCandidate>>,
    genres: HashMap<String, Vec<String>>,
    failing_artists: HashSet<String>,
    playlists: Vec<(PlaylistRef, Vec<RecommendationCandidate>)>,
    genre_delay: Option<Duration>,
    genre_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    find_playlist_calls: AtomicUsize,
    playlist_track_calls: AtomicUsize,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recent(mut self, tracks: Vec<RecommendationCandidate>) -> Self {
        self.recent = Some(tracks);
        self
    }

    pub fn failing_recent(mut self) -> Self {
        self.recent_fails = true;
        self
    }

    pub fn with_top(mut self, range: TimeRange, tracks: Vec<RecommendationCandidate>) -> Self {
        self.top.insert(range, tracks);
        self
    }

    pub fn with_artist_genres(mut self, artist: &str, genres: &[&str]) -> Self {
        self.genres.insert(
            artist.to_lowercase(),
            genres.iter().map(|g| g.to_string()).collect(),
        );
        self
    }

    pub fn failing_artist(mut self, artist: &str) -> Self {
        self.failing_artists.insert(artist.to_lowercase());
        self
    }

    pub fn with_playlist(mut self, playlist: PlaylistRef, tracks: Vec<RecommendationCandidate>) -> Self {
        self.playlists.push((playlist, tracks));
        self
    }

    pub fn with_genre_delay(mut self, delay: Duration) -> Self {
        self.genre_delay = Some(delay);
        self
    }

    pub fn genre_calls(&self) -> usize {
        self.genre_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn find_playlist_calls(&self) -> usize {
        self.find_playlist_calls.load(Ordering::SeqCst)
    }

    pub fn playlist_track_calls(&self) -> usize {
        self.playlist_track_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for StubCatalog {
    async fn recently_played(
        &self,
        _token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        if self.recent_fails {
            return Err(ProviderError::Status(500));
        }
        Ok(self.recent.clone().unwrap_or_default())
    }

    async fn top_tracks(
        &self,
        range: TimeRange,
        _token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        Ok(self.top.get(&range).cloned().unwrap_or_default())
    }

    async fn artist_genres(&self, name: &str, _token: &str) -> Result<Vec<String>, ProviderError> {
        self.genre_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.genre_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = name.to_lowercase();
        if self.failing_artists.contains(&key) {
            return Err(ProviderError::Status(502));
        }
        Ok(self.genres.get(&key).cloned().unwrap_or_default())
    }

    async fn find_playlists(
        &self,
        _query: &str,
        _token: &str,
    ) -> Result<Vec<PlaylistRef>, ProviderError> {
        self.find_playlist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.playlists.iter().map(|(p, _)| p.clone()).collect())
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        _token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        self.playlist_track_calls.fetch_add(1, Ordering::SeqCst);
        self.playlists
            .iter()
            .find(|(p, _)| p.id == playlist_id)
            .map(|(_, tracks)| tracks.clone())
            .ok_or_else(|| ProviderError::NotFound(playlist_id.to_string()))
    }
}

/// Video search returning a fixed hit, optionally held until released.
pub struct StubSearch {
    result: Result<Option<String>, ProviderError>,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubSearch {
    pub fn returning(content_id: &str) -> Self {
        Self {
            result: Ok(Some(content_id.to_string())),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Block every search until a permit is added to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(q, _)| q.clone()).collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, k)| k.clone()).collect()
    }
}

#[async_trait]
impl VideoSearch for StubSearch {
    async fn search(&self, query: &str, api_key: &str) -> Result<Option<String>, ProviderError> {
        self.calls
            .lock()
            .push((query.to_string(), api_key.to_string()));

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.result.clone()
    }
}
