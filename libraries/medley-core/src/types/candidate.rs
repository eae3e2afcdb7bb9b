//! External match candidate type

use serde::{Deserialize, Serialize};

/// A recording returned by an external match source
///
/// `score` starts at the provider's confidence and is only ever raised by
/// [`MatchCandidate::boost`], never above 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// External recording id
    pub recording_id: String,

    /// External release id
    pub release_id: Option<String>,

    /// External artist id
    pub artist_id: Option<String>,

    pub title: String,

    /// Primary credited artist
    pub artist: String,

    pub album: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<i32>,
    pub total_tracks: Option<i32>,

    #[serde(default)]
    pub genres: Vec<String>,

    /// Confidence in [0, 1]
    pub score: f64,

    pub cover_art_url: Option<String>,
    pub disambiguation: Option<String>,
}

impl MatchCandidate {
    /// Create a candidate with the required fields; everything optional is absent
    pub fn new(
        recording_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            recording_id: recording_id.into(),
            release_id: None,
            artist_id: None,
            title: title.into(),
            artist: artist.into(),
            album: None,
            year: None,
            track_number: None,
            total_tracks: None,
            genres: Vec::new(),
            score: score.clamp(0.0, 1.0),
            cover_art_url: None,
            disambiguation: None,
        }
    }

    /// Raise the score by a corroboration boost, clamped to 1.0
    ///
    /// Negative amounts are ignored.
    pub fn boost(&mut self, amount: f64) {
        if amount > 0.0 {
            self.score = (self.score + amount).min(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boost_is_clamped_to_one() {
        let mut candidate = MatchCandidate::new("rec", "Title", "Artist", 0.95);
        candidate.boost(0.10);
        assert_eq!(candidate.score, 1.0);
    }

    #[test]
    fn boost_never_lowers_score() {
        let mut candidate = MatchCandidate::new("rec", "Title", "Artist", 0.5);
        candidate.boost(-0.3);
        assert_eq!(candidate.score, 0.5);
    }

    #[test]
    fn provider_score_is_clamped_on_creation() {
        assert_eq!(MatchCandidate::new("r", "t", "a", 1.7).score, 1.0);
        assert_eq!(MatchCandidate::new("r", "t", "a", -0.2).score, 0.0);
    }
}
