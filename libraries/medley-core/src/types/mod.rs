mod candidate;
mod track;

pub use candidate::MatchCandidate;
pub use track::{needs_enrichment, SourceKind, Track, TrackId, TrackSource};
