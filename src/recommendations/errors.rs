//! Typed errors for the recommendation system.

use crate::cache::CacheError;
use crate::providers::ProviderError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum RecommendationError {
    /// A catalog call failed (top tracks, playlist lookup, etc.)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Recommendations need the caller's catalog token
    #[error("No catalog access token supplied")]
    MissingToken,

    /// The regional fallback playlist could not be located
    #[error("No fallback playlist found for '{0}'")]
    NoFallbackPlaylist(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<ProviderError> for RecommendationError {
    fn from(e: ProviderError) -> Self {
        RecommendationError::Catalog(e.to_string())
    }
}

impl From<CacheError> for RecommendationError {
    fn from(e: CacheError) -> Self {
        RecommendationError::Cache(e.to_string())
    }
}
