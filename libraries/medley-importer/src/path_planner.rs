//! Canonical library paths
//!
//! Every track has exactly one place in the managed library:
//!
//! ```text
//! {root}/{Artist}/{Year} - {Album}/{NN} - {Title}.{ext}
//! ```
//!
//! Planning is a pure function of the track's tags and source file name.

use medley_core::Track;
use std::path::{Path, PathBuf};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Separators that join a featured artist to the primary one, checked in order
pub const ARTIST_SEPARATORS: &[&str] = &[" feat. ", " ft. ", " featuring ", " with ", " & ", " and "];

/// Longest allowed path component, in characters
pub const MAX_COMPONENT_LENGTH: usize = 200;

/// Characters that are illegal in a path component on common filesystems
pub const ILLEGAL_CHARACTERS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Clone)]
pub struct PathPlanner {
    library_root: PathBuf,
}

impl PathPlanner {
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
        }
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    /// Absolute canonical path for `track`
    pub fn plan(&self, track: &Track) -> PathBuf {
        self.library_root.join(self.relative_path(track))
    }

    /// Canonical path relative to the library root
    pub fn relative_path(&self, track: &Track) -> PathBuf {
        let artist = track
            .first_artist()
            .map(primary_artist)
            .map(sanitize_component)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let album = Some(sanitize_component(&track.album))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        let year = sanitize_component(&track.year);
        let album_folder = if year.is_empty() {
            album
        } else {
            truncate(&format!("{} - {}", year, album))
        };

        let source_stem = track
            .local_path()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned());
        let title = Some(sanitize_component(&track.title))
            .filter(|t| !t.is_empty())
            .or_else(|| source_stem.as_deref().map(sanitize_component))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let number = if track.track_number > 0 {
            format!("{:02}", track.track_number)
        } else {
            "00".to_string()
        };
        let mut file_name = truncate(&format!("{} - {}", number, title));

        // Extension keeps its case; only illegal characters are replaced
        if let Some(ext) = track.local_path().and_then(Path::extension) {
            file_name.push('.');
            file_name.extend(ext.to_string_lossy().chars().map(replace_illegal));
        }

        [artist, album_folder, file_name].iter().collect()
    }
}

/// Primary artist of a multi-artist credit
///
/// The first separator (in [`ARTIST_SEPARATORS`] order) that occurs after
/// the start of the name wins; the name is cut at its leftmost occurrence.
pub fn primary_artist(artist: &str) -> &str {
    // ASCII lowercasing keeps byte offsets aligned with `artist`
    let lower = artist.to_ascii_lowercase();

    for separator in ARTIST_SEPARATORS {
        if let Some(index) = lower.find(separator) {
            if index > 0 {
                return artist[..index].trim();
            }
        }
    }

    artist.trim()
}

/// Make a single path component filesystem-safe
///
/// Illegal characters become `_`, leading and trailing dots and spaces are
/// removed, and the result is capped at [`MAX_COMPONENT_LENGTH`] characters.
pub fn sanitize_component(s: &str) -> String {
    let replaced: String = s.chars().map(replace_illegal).collect();

    truncate(replaced.trim_matches(|c| c == '.' || c == ' '))
}

fn replace_illegal(c: char) -> char {
    if ILLEGAL_CHARACTERS.contains(&c) || c.is_control() {
        '_'
    } else {
        c
    }
}

fn truncate(s: &str) -> String {
    let capped: String = s.chars().take(MAX_COMPONENT_LENGTH).collect();
    // Cutting can expose a trailing dot or space again
    capped.trim_end_matches(|c| c == '.' || c == ' ').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_track() -> Track {
        let mut track = Track::local("/inbox/Downloads/bohemian.FLAC");
        track.title = "Bohemian Rhapsody".to_string();
        track.artists = vec!["Queen".to_string()];
        track.album = "A Night at the Opera".to_string();
        track.year = "1975".to_string();
        track.track_number = 11;
        track
    }

    #[test]
    fn test_full_layout() {
        let planner = PathPlanner::new("/music");
        assert_eq!(
            planner.plan(&test_track()),
            PathBuf::from("/music/Queen/1975 - A Night at the Opera/11 - Bohemian Rhapsody.FLAC")
        );
    }

    #[test]
    fn test_fallback_values() {
        let planner = PathPlanner::new("/music");
        let track = Track::local("/inbox/track07.mp3");

        assert_eq!(
            planner.relative_path(&track),
            PathBuf::from("Unknown Artist/Unknown Album/00 - track07.mp3")
        );
    }

    #[test]
    fn test_empty_year_has_no_prefix() {
        let planner = PathPlanner::new("/music");
        let mut track = test_track();
        track.year = "  ".to_string();

        let path = planner.relative_path(&track);
        let album_folder = path.iter().nth(1).unwrap().to_string_lossy().into_owned();
        assert_eq!(album_folder, "A Night at the Opera");
    }

    #[test]
    fn test_track_number_padding() {
        let planner = PathPlanner::new("/music");
        let mut track = test_track();

        track.track_number = 3;
        assert!(planner.plan(&track).ends_with("03 - Bohemian Rhapsody.FLAC"));

        track.track_number = 112;
        assert!(planner.plan(&track).ends_with("112 - Bohemian Rhapsody.FLAC"));

        track.track_number = -1;
        assert!(planner.plan(&track).ends_with("00 - Bohemian Rhapsody.FLAC"));
    }

    #[test]
    fn test_extension_keeps_case_but_not_illegal_characters() {
        let planner = PathPlanner::new("/music");
        let mut track = test_track();
        track.source = medley_core::TrackSource::Local {
            path: PathBuf::from("/inbox/odd.M:p3"),
        };

        assert!(planner.plan(&track).ends_with("11 - Bohemian Rhapsody.M_p3"));
    }

    #[test]
    fn test_primary_artist() {
        assert_eq!(primary_artist("Daft Punk feat. Pharrell Williams"), "Daft Punk");
        assert_eq!(primary_artist("Eminem FT. Rihanna"), "Eminem");
        assert_eq!(primary_artist("Simon & Garfunkel"), "Simon");
        assert_eq!(primary_artist("Crosby, Stills and Nash"), "Crosby, Stills");
        assert_eq!(primary_artist("Brandy featuring Monica"), "Brandy");
        assert_eq!(primary_artist("Björk with Thom Yorke"), "Björk");
        // Separator order decides, not position
        assert_eq!(primary_artist("A and B feat. C"), "A and B");
        assert_eq!(primary_artist("Radiohead"), "Radiohead");
    }

    #[test]
    fn test_separator_at_start_is_ignored() {
        assert_eq!(primary_artist(" & Friends"), "& Friends");
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("AC/DC"), "AC_DC");
        assert_eq!(sanitize_component("What?: A \"Song\" <live>|*"), "What__ A _Song_ _live___");
        assert_eq!(sanitize_component("..hidden.."), "hidden");
        assert_eq!(sanitize_component("  spaced  "), "spaced");
        assert_eq!(sanitize_component("back\\slash"), "back_slash");
    }

    #[test]
    fn test_components_are_capped() {
        let planner = PathPlanner::new("/music");
        let mut track = test_track();
        track.title = "x".repeat(500);
        track.album = "y".repeat(500);

        let path = planner.relative_path(&track);
        for component in path.iter() {
            let name = component.to_string_lossy();
            let stem = name.trim_end_matches(".FLAC");
            assert!(stem.chars().count() <= MAX_COMPONENT_LENGTH);
        }
    }

    #[test]
    fn test_artist_of_only_illegal_dots_falls_back() {
        let planner = PathPlanner::new("/music");
        let mut track = test_track();
        track.artists = vec!["...".to_string()];

        assert!(planner.relative_path(&track).starts_with("Unknown Artist"));
    }
}
