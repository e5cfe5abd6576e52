use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::models::SearchResponse;
use crate::config::REQUEST_TIMEOUT_SECONDS;
use crate::providers::{KeyProbe, ProbeOutcome, ProviderError, VideoSearch};
use async_trait::async_trait;

pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Video looked up by the quota probe; any public video works.
const PROBE_VIDEO_ID: &str = "Ks-_Mh1QhMc";

pub struct YouTubeClient {
    client: Client,
    api_base: String,
}

impl YouTubeClient {
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
}

/// Map a YouTube Data API status onto what it says about the key.
pub fn classify_status(status: StatusCode) -> ProbeOutcome {
    match status.as_u16() {
        200..=299 => ProbeOutcome::Valid,
        403 => ProbeOutcome::QuotaExceeded,
        400 => ProbeOutcome::Invalid,
        _ => ProbeOutcome::Inconclusive,
    }
}

#[async_trait]
impl KeyProbe for YouTubeClient {
    async fn probe(&self, api_key: &str) -> ProbeOutcome {
        let url = format!("{}/videos", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[("part", "id"), ("id", PROBE_VIDEO_ID), ("key", api_key)])
            .send()
            .await;

        match response {
            Ok(resp) => {
                let outcome = classify_status(resp.status());
                if outcome == ProbeOutcome::Inconclusive {
                    log::debug!("Key probe returned HTTP {}", resp.status());
                }
                outcome
            }
            Err(e) => {
                log::debug!("Key probe failed: {}", e);
                ProbeOutcome::Inconclusive
            }
        }
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn search(&self, query: &str, api_key: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/search", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        match classify_status(status) {
            ProbeOutcome::Valid => {}
            ProbeOutcome::QuotaExceeded => return Err(ProviderError::QuotaExceeded),
            ProbeOutcome::Invalid => return Err(ProviderError::InvalidCredential),
            ProbeOutcome::Inconclusive => return Err(ProviderError::Status(status.as_u16())),
        }

        let body: SearchResponse = response.json().await?;
        let hit = body.first_video_id();
        log::debug!("Video search '{}' -> {:?}", query, hit);
        Ok(hit)
    }
}
