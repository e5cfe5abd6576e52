//! Seams to the external services the pipeline depends on.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ProviderError;
pub use traits::{AudioSource, Catalog, KeyProbe, VideoSearch};
pub use types::{FormatDescriptor, PlaylistRef, ProbeOutcome, TimeRange};
