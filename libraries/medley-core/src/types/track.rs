//! Track domain type

use crate::error::{MedleyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Catalog identifier, assigned by the catalog on first save
pub type TrackId = i64;

/// Where a track's audio lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackSource {
    /// A file on the local filesystem
    Local { path: PathBuf },

    /// A track on a streaming platform, addressed by URL
    Streamed {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        platform_id: Option<String>,
    },
}

/// Kind of source, without the location payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Local,
    Streamed,
}

impl TrackSource {
    /// Get the kind of this source
    pub fn kind(&self) -> SourceKind {
        match self {
            TrackSource::Local { .. } => SourceKind::Local,
            TrackSource::Streamed { .. } => SourceKind::Streamed,
        }
    }

    /// Human-readable location (file path or URL)
    pub fn location(&self) -> String {
        match self {
            TrackSource::Local { path } => path.display().to_string(),
            TrackSource::Streamed { url, .. } => url.clone(),
        }
    }
}

/// A song known to the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog id, `None` until persisted
    pub id: Option<TrackId>,

    /// Local file or streamed URL
    pub source: TrackSource,

    /// Track title (may be empty when tags are missing)
    pub title: String,

    /// Artist names, primary artist first
    pub artists: Vec<String>,

    /// Album name (may be empty)
    pub album: String,

    pub track_number: i32,
    pub disc_number: i32,

    /// Number of tracks on the album
    pub total_tracks: i32,

    /// Release year as tagged, may be empty or unparseable
    pub year: String,

    /// Duration in seconds
    pub duration_seconds: i32,

    /// ReplayGain track gain in dB
    pub gain: f64,

    /// ReplayGain track peak
    pub peak: f64,

    /// File modification time, seconds since the Unix epoch
    pub last_modified: i64,

    pub cover_art_path: Option<PathBuf>,

    /// External recording id applied by enrichment
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recording_id: Option<String>,

    /// SHA-256 content hash computed at import
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_hash: Option<String>,
}

impl Track {
    /// Create an untagged track for a local file
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::with_source(TrackSource::Local { path: path.into() })
    }

    /// Create an untagged track for a streamed URL
    ///
    /// # Errors
    /// Returns `InvalidInput` if the URL is empty
    pub fn streamed(url: impl Into<String>, platform_id: Option<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(MedleyError::invalid_input(
                "streamed track requires a URL",
            ));
        }
        Ok(Self::with_source(TrackSource::Streamed { url, platform_id }))
    }

    fn with_source(source: TrackSource) -> Self {
        Self {
            id: None,
            source,
            title: String::new(),
            artists: Vec::new(),
            album: String::new(),
            track_number: 0,
            disc_number: 0,
            total_tracks: 0,
            year: String::new(),
            duration_seconds: 0,
            gain: 0.0,
            peak: 0.0,
            last_modified: 0,
            cover_art_path: None,
            recording_id: None,
            file_hash: None,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Path of the backing file, if this is a local track
    pub fn local_path(&self) -> Option<&Path> {
        match &self.source {
            TrackSource::Local { path } => Some(path.as_path()),
            TrackSource::Streamed { .. } => None,
        }
    }

    /// Directory containing the backing file
    pub fn folder(&self) -> Option<&Path> {
        self.local_path().and_then(Path::parent)
    }

    /// First non-empty artist name
    pub fn first_artist(&self) -> Option<&str> {
        self.artists
            .iter()
            .map(|a| a.trim())
            .find(|a| !a.is_empty())
    }

    /// Title, or the file stem when the title is empty
    pub fn display_name(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.clone();
        }
        match &self.source {
            TrackSource::Local { path } => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            TrackSource::Streamed { url, .. } => url.clone(),
        }
    }

    /// Year parsed as a number, if it is one
    pub fn year_number(&self) -> Option<i32> {
        self.year.trim().parse().ok()
    }

    /// Whether the tags carry nothing that identifies the song
    pub fn is_untagged(&self) -> bool {
        self.title.trim().is_empty() && self.first_artist().is_none() && self.album.trim().is_empty()
    }

    /// See [`needs_enrichment`]
    pub fn needs_enrichment(&self) -> bool {
        needs_enrichment(self)
    }
}

/// Whether a track is missing metadata that enrichment can fill in
///
/// Any single missing field is enough: first artist, title, album, year, or
/// cover art.
pub fn needs_enrichment(track: &Track) -> bool {
    track.first_artist().is_none()
        || track.title.trim().is_empty()
        || track.album.trim().is_empty()
        || track.year.trim().is_empty()
        || match &track.cover_art_path {
            Some(path) => path.as_os_str().is_empty(),
            None => true,
        }
}
