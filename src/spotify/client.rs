use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::models::{SearchResponse, TopTracksResponse, TrackItemsResponse};
use crate::config::REQUEST_TIMEOUT_SECONDS;
use crate::providers::{Catalog, PlaylistRef, ProviderError, TimeRange};
use crate::recommendations::types::RecommendationCandidate;
use async_trait::async_trait;

pub const API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify Web API client. Stateless apart from the HTTP pool; the bearer
/// token comes with every call.
#[derive(Clone)]
pub struct SpotifyCatalog {
    client: Client,
    api_base: String,
}

impl SpotifyCatalog {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(API_BASE)
    }

    pub fn with_base_url(api_base: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        token: &str,
        operation: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.api_base, path);
        let response = self
            .client
            .get(&url)
            .query(params)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            401 => {
                log::warn!("[{}] Catalog rejected the access token", operation);
                return Err(ProviderError::InvalidCredential);
            }
            429 => {
                log::warn!("[{}] Rate limited by catalog", operation);
                return Err(ProviderError::Status(429));
            }
            _ if !status.is_success() => {
                log::warn!("[{}] Request failed ({})", operation, status);
                return Err(ProviderError::Status(status.as_u16()));
            }
            _ => {}
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::ParseError(format!("{}: {}", operation, e)))
    }
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    async fn recently_played(
        &self,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        let response: TrackItemsResponse = self
            .make_request(
                "/me/player/recently-played",
                &[("limit", "50")],
                token,
                "recently_played",
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.track?.into_candidate())
            .collect())
    }

    async fn top_tracks(
        &self,
        range: TimeRange,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        let response: TopTracksResponse = self
            .make_request(
                "/me/top/tracks",
                &[("time_range", range.as_str()), ("limit", "50")],
                token,
                "top_tracks",
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|track| track.into_candidate())
            .collect())
    }

    async fn artist_genres(&self, name: &str, token: &str) -> Result<Vec<String>, ProviderError> {
        if name.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response: SearchResponse = self
            .make_request(
                "/search",
                &[("q", name), ("type", "artist"), ("limit", "1")],
                token,
                "artist_genres",
            )
            .await?;

        Ok(response
            .artists
            .and_then(|page| page.items.into_iter().flatten().next())
            .map(|artist| artist.genres)
            .unwrap_or_default())
    }

    async fn find_playlists(
        &self,
        query: &str,
        token: &str,
    ) -> Result<Vec<PlaylistRef>, ProviderError> {
        let response: SearchResponse = self
            .make_request(
                "/search",
                &[("q", query), ("type", "playlist"), ("limit", "10")],
                token,
                "find_playlists",
            )
            .await?;

        Ok(response
            .playlists
            .map(|page| {
                page.items
                    .into_iter()
                    .flatten()
                    .map(PlaylistRef::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        let path = format!("/playlists/{}/tracks", urlencoding::encode(playlist_id));
        let response: TrackItemsResponse = self
            .make_request(&path, &[("limit", "100")], token, "playlist_tracks")
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.track?.into_candidate())
            .collect())
    }
}
