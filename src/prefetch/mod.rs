//! Speculative preparation of the next track.
//!
//! ```text
//! [SongService] → dispatch → [PrefetchDispatcher] → spawn → [PrefetchOrchestrator]
//!                                     │
//!                                     └── broadcast PrefetchOutcome
//! ```

pub mod dispatcher;
pub mod orchestrator;

pub use dispatcher::{PrefetchDispatcher, PrefetchOutcome};
pub use orchestrator::{PrefetchError, PrefetchOrchestrator};
