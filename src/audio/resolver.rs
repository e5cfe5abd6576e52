use crate::config::AudioConfig;
use crate::models::ResolvedAudio;
use crate::providers::AudioSource;
use reqwest::Url;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioResolveError {
    #[error("No playable audio for '{content_id}' after {attempts} attempts")]
    Exhausted { content_id: String, attempts: usize },
}

/// Resolves a playable URL for a content id through an ordered fallback chain:
///
/// 1. each preferred format, in order
/// 2. one generic "best audio" request
/// 3. every audio-only format the source lists, in the source's order
///
/// The first URL that passes validation wins. The chain is bounded by the
/// number of formats; nothing is retried beyond it.
pub struct AudioResolver {
    source: Arc<dyn AudioSource>,
    preferred_formats: Vec<String>,
    generic_format: String,
    delivery_host: String,
}

impl AudioResolver {
    pub fn new(source: Arc<dyn AudioSource>, config: &AudioConfig) -> Self {
        Self {
            source,
            preferred_formats: config.preferred_formats.clone(),
            generic_format: config.generic_format.clone(),
            delivery_host: config.delivery_host.trim_start_matches('.').to_lowercase(),
        }
    }

    pub async fn resolve(&self, content_id: &str) -> Result<ResolvedAudio, AudioResolveError> {
        let mut attempts = 0usize;

        for format in &self.preferred_formats {
            attempts += 1;
            if let Some(url) = self.try_format(content_id, format).await {
                return Ok(Self::resolved(content_id, url, format));
            }
        }

        attempts += 1;
        if let Some(url) = self.try_format(content_id, &self.generic_format).await {
            return Ok(Self::resolved(content_id, url, &self.generic_format));
        }

        match self.source.list_formats(content_id).await {
            Ok(formats) => {
                let audio_formats: Vec<String> = formats
                    .into_iter()
                    .filter(|f| f.audio_only)
                    .map(|f| f.id)
                    .collect();

                log::debug!(
                    "[{}] Trying {} enumerated audio formats",
                    content_id,
                    audio_formats.len()
                );

                for format in &audio_formats {
                    attempts += 1;
                    if let Some(url) = self.try_format(content_id, format).await {
                        return Ok(Self::resolved(content_id, url, format));
                    }
                }
            }
            Err(e) => {
                log::warn!("[{}] Could not list formats: {}", content_id, e);
            }
        }

        log::error!(
            "All fallback attempts failed for '{}' ({} attempts)",
            content_id,
            attempts
        );
        Err(AudioResolveError::Exhausted {
            content_id: content_id.to_string(),
            attempts,
        })
    }

    async fn try_format(&self, content_id: &str, format: &str) -> Option<String> {
        match self.source.resolve(content_id, format).await {
            Ok(raw) => {
                let url = self.validate(&raw);
                if url.is_none() {
                    log::debug!(
                        "[{}] Format {} returned an unusable URL: {}",
                        content_id,
                        format,
                        preview(raw.trim())
                    );
                }
                url
            }
            Err(e) => {
                log::debug!("[{}] Format {} failed: {}", content_id, format, e);
                None
            }
        }
    }

    /// Accept only absolute http(s) URLs served from the delivery host.
    pub fn validate(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed).ok()?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return None;
        }

        let host = url.host_str()?.to_lowercase();
        let on_delivery_host = host == self.delivery_host
            || host.ends_with(&format!(".{}", self.delivery_host));

        on_delivery_host.then(|| trimmed.to_string())
    }

    fn resolved(content_id: &str, url: String, format: &str) -> ResolvedAudio {
        log::info!(
            "[{}] Resolved audio with format {}: {}",
            content_id,
            format,
            preview(&url)
        );
        ResolvedAudio {
            url,
            format: format.to_string(),
        }
    }
}

fn preview(url: &str) -> String {
    if url.len() > 80 {
        format!("{}...", url.chars().take(80).collect::<String>())
    } else {
        url.to_string()
    }
}
