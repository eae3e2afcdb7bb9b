/// Collaborator traits consumed by the import and enrichment pipeline
///
/// Implementations live outside the core: tag I/O in `medley-importer`, the
/// MusicBrainz source and cover art embedding in `medley-enrichment`, and any
/// persistent catalog in the host application.
use crate::error::Result;
use crate::types::{MatchCandidate, Track, TrackId};
use async_trait::async_trait;
use std::path::Path;

/// Tag reader
///
/// Implementers extract track metadata from audio containers. Reading must not
/// mutate the file.
pub trait TagReader: Send + Sync {
    /// Read tags from `path`, or `None` if the file is unreadable
    fn read(&self, path: &Path) -> Option<Track>;
}

/// Tag writer
///
/// Best-effort: a `false` return is logged by callers and never fails the
/// pipeline.
pub trait TagWriter: Send + Sync {
    /// Write the matched fields and external ids of `candidate` into the file at `path`
    fn write_external_ids(&self, path: &Path, candidate: &MatchCandidate) -> bool;
}

/// Track catalog (persistence)
///
/// Upsert semantics keyed on the track's source path. Implementations are
/// expected to serialize concurrent access themselves.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Insert or update a track, returning its id
    async fn save(&self, track: &Track) -> Result<TrackId>;

    /// Get every cataloged track
    async fn get_all(&self) -> Result<Vec<Track>>;

    /// Get the track backed by the local file at `path`
    async fn get_by_path(&self, path: &Path) -> Result<Option<Track>>;

    /// Delete a track
    async fn delete(&self, id: TrackId) -> Result<()>;
}

/// External match source (e.g. MusicBrainz)
///
/// Network-backed and fallible. Callers throttle requests through a shared
/// rate limiter; implementations do not throttle themselves.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Search recordings by artist and title
    async fn search(&self, artist: &str, title: &str, limit: usize) -> Result<Vec<MatchCandidate>>;

    /// Look up a single recording by its external id
    async fn lookup(&self, recording_id: &str) -> Result<Option<MatchCandidate>> {
        let _ = recording_id;
        Ok(None)
    }
}

/// Cover art fetch and embed
#[async_trait]
pub trait CoverArtEmbedder: Send + Sync {
    /// Download the image at `url` and attach it to the file at `path`
    async fn embed_from_url(&self, path: &Path, url: &str) -> bool;
}
