//! Medley Core
//!
//! Shared domain types, collaborator traits, and error handling for the Medley
//! library import and enrichment pipeline.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackSource`, `MatchCandidate`
//! - **Collaborator Traits**: `TagReader`, `TagWriter`, `Catalog`, `MatchSource`,
//!   `CoverArtEmbedder`
//! - **Error Handling**: Unified `MedleyError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use medley_core::types::Track;
//!
//! let mut track = Track::local("/music/inbox/song.flac");
//! track.title = "Let It Be".to_string();
//! track.artists = vec!["The Beatles".to_string()];
//!
//! // Album, year and cover art are still missing
//! assert!(track.needs_enrichment());
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod traits;
pub mod types;

pub use catalog::MemoryCatalog;
pub use error::{MedleyError, Result};
pub use traits::{Catalog, CoverArtEmbedder, MatchSource, TagReader, TagWriter};
pub use types::{needs_enrichment, MatchCandidate, SourceKind, Track, TrackId, TrackSource};
