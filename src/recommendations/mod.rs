//! Candidate selection for the next track.
//!
//! Draws on the listener's catalog history and filters by the genre tags of
//! each candidate's primary artist.

pub mod cache;
pub mod engine;
pub mod errors;
pub mod types;

pub use engine::RecommendationEngine;
pub use errors::RecommendationError;
pub use types::RecommendationCandidate;
