use crate::providers::error::ProviderError;
use crate::providers::types::{FormatDescriptor, PlaylistRef, ProbeOutcome, TimeRange};
use crate::recommendations::types::RecommendationCandidate;
use async_trait::async_trait;

/// Turns a content id into a direct media URL.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Resolve the direct URL for one format. The raw value is returned unvalidated.
    async fn resolve(&self, content_id: &str, format: &str) -> Result<String, ProviderError>;

    /// Every format the source reports for this content, in its order.
    async fn list_formats(&self, content_id: &str) -> Result<Vec<FormatDescriptor>, ProviderError>;
}

/// The music catalog. Every call carries the caller's bearer token.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn recently_played(&self, token: &str)
        -> Result<Vec<RecommendationCandidate>, ProviderError>;

    async fn top_tracks(
        &self,
        range: TimeRange,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError>;

    /// Genres of the best artist match for `name`; empty when nothing matched.
    async fn artist_genres(&self, name: &str, token: &str) -> Result<Vec<String>, ProviderError>;

    async fn find_playlists(&self, query: &str, token: &str)
        -> Result<Vec<PlaylistRef>, ProviderError>;

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        token: &str,
    ) -> Result<Vec<RecommendationCandidate>, ProviderError>;
}

/// Free-text search on the audio source's own index.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Content id of the first hit, if any.
    async fn search(&self, query: &str, api_key: &str) -> Result<Option<String>, ProviderError>;
}

/// Cheap call used to check a credential before handing it out.
#[async_trait]
pub trait KeyProbe: Send + Sync {
    async fn probe(&self, api_key: &str) -> ProbeOutcome;
}
