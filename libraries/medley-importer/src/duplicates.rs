//! Duplicate and conflict detection
//!
//! A candidate file is a duplicate when its bytes match a cataloged file
//! (exact content), or failing that when its first artist, title and album
//! match a cataloged track case-insensitively (a re-encode of the same
//! recording).
//!
//! Every check hashes every cataloged file that still exists, so the cost is
//! linear in catalog size per imported file.

use crate::transfer::{compute_file_hash, same_content};
use crate::Result;
use medley_core::Track;
use std::path::Path;

/// Why a file was classified as a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateBasis {
    /// Byte-identical to a cataloged file
    ExactContent,
    /// Same first artist, title and album as a cataloged track
    MetadataMatch,
}

impl std::fmt::Display for DuplicateBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateBasis::ExactContent => write!(f, "exact content"),
            DuplicateBasis::MetadataMatch => write!(f, "metadata match"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DuplicateCheck {
    /// Not a duplicate; carries the candidate's content hash for reuse
    Unique { content_hash: String },
    Duplicate { existing: Track, basis: DuplicateBasis },
}

/// Outcome of a target-path collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Same bytes already at the target: keep it, nothing to do
    Identical,
    /// Different file at the target: needs a decision from the user
    NeedsDecision,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateDetector;

impl DuplicateDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify `source` against the catalog
    ///
    /// Catalog entries backed by `source` itself are skipped, as are entries
    /// whose file no longer exists (for the content comparison).
    pub fn check(&self, source: &Path, track: &Track, catalog: &[Track]) -> Result<DuplicateCheck> {
        let content_hash = compute_file_hash(source)?;

        for existing in catalog {
            let Some(path) = existing.local_path() else {
                continue;
            };
            if path == source || !path.is_file() {
                continue;
            }

            match compute_file_hash(path) {
                Ok(hash) if hash == content_hash => {
                    tracing::debug!(
                        source = %source.display(),
                        existing = %path.display(),
                        "Exact duplicate"
                    );
                    return Ok(DuplicateCheck::Duplicate {
                        existing: existing.clone(),
                        basis: DuplicateBasis::ExactContent,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Cannot hash cataloged file");
                }
            }
        }

        if let Some(existing) = catalog
            .iter()
            .filter(|t| t.local_path() != Some(source))
            .find(|t| same_recording(track, t))
        {
            tracing::debug!(
                source = %source.display(),
                existing = %existing.source.location(),
                "Metadata duplicate"
            );
            return Ok(DuplicateCheck::Duplicate {
                existing: existing.clone(),
                basis: DuplicateBasis::MetadataMatch,
            });
        }

        Ok(DuplicateCheck::Unique { content_hash })
    }

    /// Decide what to do when `target` is already occupied
    pub fn resolve_conflict(&self, source: &Path, target: &Path) -> Result<ConflictResolution> {
        if same_content(source, target)? {
            Ok(ConflictResolution::Identical)
        } else {
            Ok(ConflictResolution::NeedsDecision)
        }
    }
}

/// First artist, title and album equal, ignoring case
///
/// Both tracks need an artist and a title; two untagged files are never the
/// same recording.
fn same_recording(a: &Track, b: &Track) -> bool {
    let (Some(artist_a), Some(artist_b)) = (a.first_artist(), b.first_artist()) else {
        return false;
    };
    if a.title.trim().is_empty() {
        return false;
    }

    eq_ignore_case(artist_a, artist_b)
        && eq_ignore_case(&a.title, &b.title)
        && eq_ignore_case(&a.album, &b.album)
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tagged(path: &Path, artist: &str, title: &str, album: &str) -> Track {
        let mut track = Track::local(path);
        track.artists = vec![artist.to_string()];
        track.title = title.to_string();
        track.album = album.to_string();
        track
    }

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn identical_bytes_are_exact_duplicates() {
        let temp = TempDir::new().unwrap();
        let existing = write(temp.path(), "library.mp3", b"audio-bytes");
        let candidate = write(temp.path(), "renamed.mp3", b"audio-bytes");

        let catalog = vec![tagged(&existing, "A", "Song", "Album")];
        let check = DuplicateDetector::new()
            .check(&candidate, &tagged(&candidate, "Other", "Different", ""), &catalog)
            .unwrap();

        match check {
            DuplicateCheck::Duplicate { basis, existing: e } => {
                assert_eq!(basis, DuplicateBasis::ExactContent);
                assert_eq!(e.local_path(), Some(existing.as_path()));
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn same_tags_different_bytes_are_metadata_duplicates() {
        let temp = TempDir::new().unwrap();
        let existing = write(temp.path(), "song.flac", b"lossless");
        let candidate = write(temp.path(), "song.mp3", b"lossy");

        let catalog = vec![tagged(&existing, "Nirvana", "Lithium", "Nevermind")];
        let check = DuplicateDetector::new()
            .check(&candidate, &tagged(&candidate, "NIRVANA", "lithium", "nevermind "), &catalog)
            .unwrap();

        assert!(matches!(
            check,
            DuplicateCheck::Duplicate {
                basis: DuplicateBasis::MetadataMatch,
                ..
            }
        ));
    }

    #[test]
    fn unrelated_file_is_unique() {
        let temp = TempDir::new().unwrap();
        let existing = write(temp.path(), "a.mp3", b"one");
        let candidate = write(temp.path(), "b.mp3", b"two");

        let catalog = vec![tagged(&existing, "Nirvana", "Lithium", "Nevermind")];
        let check = DuplicateDetector::new()
            .check(&candidate, &tagged(&candidate, "Nirvana", "Lithium", "MTV Unplugged"), &catalog)
            .unwrap();

        match check {
            DuplicateCheck::Unique { content_hash } => assert_eq!(content_hash.len(), 64),
            other => panic!("expected unique, got {:?}", other),
        }
    }

    #[test]
    fn missing_catalog_files_are_not_hashed() {
        let temp = TempDir::new().unwrap();
        let candidate = write(temp.path(), "b.mp3", b"bytes");
        let gone = temp.path().join("gone.mp3");

        let catalog = vec![tagged(&gone, "X", "Y", "Z")];
        let check = DuplicateDetector::new()
            .check(&candidate, &tagged(&candidate, "A", "B", "C"), &catalog)
            .unwrap();

        assert!(matches!(check, DuplicateCheck::Unique { .. }));
    }

    #[test]
    fn own_catalog_entry_is_not_a_duplicate() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "a.mp3", b"bytes");

        let catalog = vec![tagged(&file, "A", "B", "C")];
        let check = DuplicateDetector::new()
            .check(&file, &tagged(&file, "A", "B", "C"), &catalog)
            .unwrap();

        assert!(matches!(check, DuplicateCheck::Unique { .. }));
    }

    #[test]
    fn untagged_tracks_never_match_by_metadata() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.mp3", b"one");
        let b = write(temp.path(), "b.mp3", b"two");

        let catalog = vec![Track::local(&a)];
        let check = DuplicateDetector::new().check(&b, &Track::local(&b), &catalog).unwrap();

        assert!(matches!(check, DuplicateCheck::Unique { .. }));
    }

    #[test]
    fn conflict_resolution_compares_content() {
        let temp = TempDir::new().unwrap();
        let source = write(temp.path(), "source.mp3", b"same");
        let identical = write(temp.path(), "identical.mp3", b"same");
        let different = write(temp.path(), "different.mp3", b"else");

        let detector = DuplicateDetector::new();
        assert_eq!(
            detector.resolve_conflict(&source, &identical).unwrap(),
            ConflictResolution::Identical
        );
        assert_eq!(
            detector.resolve_conflict(&source, &different).unwrap(),
            ConflictResolution::NeedsDecision
        );
    }
}
