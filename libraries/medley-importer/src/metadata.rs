//! Tag reading and writing backed by lofty

use crate::transfer::modified_seconds;
use crate::{ImportError, Result};
use lofty::{Accessor, AudioFile, ItemKey, Probe, Tag, TagExt, TaggedFileExt};
use medley_core::{MatchCandidate, TagReader, TagWriter, Track};
use std::path::Path;
use tracing::{debug, warn};

/// Reads track fields from the audio container
///
/// Cover art is left unset; the importer discovers it from the folder.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }

    /// Like [`TagReader::read`] but keeps the failure reason
    pub fn read_track(&self, path: &Path) -> Result<Track> {
        let tagged_file = Probe::open(path)
            .map_err(|e| ImportError::Metadata(format!("Failed to open file: {}", e)))?
            .read()
            .map_err(|e| ImportError::Metadata(format!("Failed to read file: {}", e)))?;

        let mut track = Track::local(path);
        track.duration_seconds = tagged_file.properties().duration().as_secs() as i32;
        track.last_modified = modified_seconds(path)?;

        // Prefer ID3v2 for MP3, Vorbis comments for OGG/FLAC
        let Some(tag) = tagged_file.primary_tag().or(tagged_file.first_tag()) else {
            return Ok(track);
        };

        track.title = tag.title().map(|s| s.trim().to_string()).unwrap_or_default();
        track.album = tag.album().map(|s| s.trim().to_string()).unwrap_or_default();

        let artist = tag
            .get_string(&ItemKey::AlbumArtist)
            .map(str::to_string)
            .or_else(|| tag.artist().map(|s| s.to_string()));
        track.artists = artist
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .into_iter()
            .collect();

        track.track_number = tag.track().unwrap_or(0) as i32;
        track.total_tracks = tag.track_total().unwrap_or(0) as i32;
        track.disc_number = tag.disk().unwrap_or(0) as i32;
        track.year = tag.year().map(|y| y.to_string()).unwrap_or_default();

        if let Some(gain) = tag.get_string(&ItemKey::ReplayGainTrackGain).and_then(parse_gain) {
            track.gain = gain;
        }
        if let Some(peak) = tag.get_string(&ItemKey::ReplayGainTrackPeak).and_then(parse_peak) {
            track.peak = peak;
        }

        Ok(track)
    }
}

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Option<Track> {
        match self.read_track(path) {
            Ok(track) => Some(track),
            Err(e) => {
                debug!(path = %path.display(), "Unreadable tags: {}", e);
                None
            }
        }
    }
}

/// Parse a gain value such as "-5.23 dB"
fn parse_gain(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix("dB").unwrap_or(s);
    s.trim().parse().ok()
}

fn parse_peak(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

/// Writes a confirmed match into the primary tag
///
/// Matched text fields replace what the file carried; empty or absent fields
/// leave the existing value alone. MusicBrainz ids are written alongside.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_match(&self, path: &Path, candidate: &MatchCandidate) -> Result<()> {
        let tag_error = |e: lofty::error::LoftyError| ImportError::Metadata(e.to_string());

        let mut tagged_file = Probe::open(path).map_err(tag_error)?.read().map_err(tag_error)?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| ImportError::Metadata(format!("No writable tag in {}", path.display())))?;

        if !candidate.title.is_empty() {
            tag.set_title(candidate.title.clone());
        }
        if !candidate.artist.is_empty() {
            tag.set_artist(candidate.artist.clone());
            tag.insert_text(ItemKey::AlbumArtist, candidate.artist.clone());
        }
        if let Some(album) = candidate.album.as_ref().filter(|a| !a.is_empty()) {
            tag.set_album(album.clone());
        }
        if let Some(year) = candidate.year.and_then(|y| u32::try_from(y).ok()) {
            tag.set_year(year);
        }
        if let Some(number) = candidate.track_number.and_then(|n| u32::try_from(n).ok()) {
            tag.set_track(number);
        }
        if let Some(total) = candidate.total_tracks.and_then(|n| u32::try_from(n).ok()) {
            tag.set_track_total(total);
        }
        if !candidate.genres.is_empty() {
            tag.set_genre(candidate.genres.join("; "));
        }

        if !candidate.recording_id.is_empty() {
            tag.insert_text(ItemKey::MusicBrainzRecordingId, candidate.recording_id.clone());
        }
        if let Some(release_id) = &candidate.release_id {
            tag.insert_text(ItemKey::MusicBrainzReleaseId, release_id.clone());
        }
        if let Some(artist_id) = &candidate.artist_id {
            tag.insert_text(ItemKey::MusicBrainzArtistId, artist_id.clone());
        }

        tag.save_to_path(path).map_err(tag_error)?;
        Ok(())
    }
}

impl TagWriter for LoftyTagWriter {
    fn write_external_ids(&self, path: &Path, candidate: &MatchCandidate) -> bool {
        match self.write_match(path, candidate) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write matched tags to {}: {}", path.display(), e);
                false
            }
        }
    }
}
