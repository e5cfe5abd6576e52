//! Data types for the recommendation system.

use serde::{Deserialize, Serialize};

/// A catalog track that may be recommended next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    /// Catalog track id
    pub id: String,
    pub title: String,
    /// Artist name(s), comma separated
    pub artist: String,
    pub album: Option<String>,
    /// Album art URL
    pub thumbnail: Option<String>,
    /// Catalog popularity, 0..=100
    pub popularity: Option<u32>,
    /// Genre tags of the primary artist, filled by the genre filter
    #[serde(default)]
    pub genres: Vec<String>,
    pub release_year: Option<u16>,
    pub duration_ms: Option<u32>,
}

impl RecommendationCandidate {
    /// First artist of the comma separated artist string.
    pub fn primary_artist(&self) -> &str {
        self.artist.split(',').next().unwrap_or("").trim()
    }

    /// Popularity used for ranking; unknown sorts last.
    pub fn popularity_score(&self) -> u32 {
        self.popularity.unwrap_or(0)
    }
}
