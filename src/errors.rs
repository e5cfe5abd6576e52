use serde::Serialize;
use thiserror::Error;

use crate::audio::AudioResolveError;
use crate::credentials::CredentialError;
use crate::providers::ProviderError;

/// Errors surfaced to the request layer by [`crate::service::SongService`].
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// A required identifier was missing; no external call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("All API credentials are exhausted or invalid")]
    CredentialsExhausted,

    /// No playable source after the whole fallback chain.
    #[error("Track not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From traits for common error types to simplify conversion

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", e))
    }
}

impl From<AudioResolveError> for AppError {
    fn from(e: AudioResolveError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Exhausted => AppError::CredentialsExhausted,
            CredentialError::EmptyPool => AppError::Validation(e.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotFound(msg) => AppError::NotFound(msg),
            ProviderError::ParseError(msg) => AppError::Internal(msg),
            other => AppError::Network(other.to_string()),
        }
    }
}
