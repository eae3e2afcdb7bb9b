//! Match scoring and selection
//!
//! Candidates come back from the match source with a provider confidence.
//! Fields we already know (album, year) corroborate a candidate and raise its
//! score; the best candidate is applied only above a confidence threshold so
//! a weak guess never overwrites real tags.

use crate::config::EnrichmentConfig;
use crate::rate_limiter::RateLimiter;
use medley_core::{MatchCandidate, MatchSource, Result, Track};
use std::sync::Arc;

/// Boost when the candidate's album equals the track's album (case-insensitive)
pub const ALBUM_BOOST: f64 = 0.10;

/// Boost when the candidate's year equals the track's year
pub const YEAR_BOOST: f64 = 0.05;

/// Lowest score `best_match` will accept
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.70;

/// Number of candidates `best_match` considers by default
pub const BEST_MATCH_POOL: usize = 5;

pub struct EnrichmentScorer {
    source: Arc<dyn MatchSource>,
    limiter: Arc<RateLimiter>,
    min_confidence: f64,
    pool_size: usize,
}

impl EnrichmentScorer {
    pub fn new(source: Arc<dyn MatchSource>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            source,
            limiter,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            pool_size: BEST_MATCH_POOL,
        }
    }

    /// Scorer with threshold and pool size taken from `config`
    pub fn from_config(
        source: Arc<dyn MatchSource>,
        limiter: Arc<RateLimiter>,
        config: &EnrichmentConfig,
    ) -> Self {
        Self::new(source, limiter)
            .with_min_confidence(config.min_confidence)
            .with_pool_size(config.max_results)
    }

    /// Override the acceptance threshold
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    /// Candidates `best_match` asks for (at least one)
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Query the match source and rank the candidates
    ///
    /// Issues at most one rate-limited query. Tracks without an artist or a
    /// title return no candidates and cost no query.
    pub async fn find_matches(&self, track: &Track, max_results: usize) -> Result<Vec<MatchCandidate>> {
        let (Some(artist), title) = (track.first_artist(), track.title.trim()) else {
            tracing::debug!(track = %track.display_name(), "No artist, skipping lookup");
            return Ok(Vec::new());
        };
        if title.is_empty() || max_results == 0 {
            tracing::debug!(artist = %artist, "No title, skipping lookup");
            return Ok(Vec::new());
        }

        self.limiter.acquire().await;

        let mut candidates = self.source.search(artist, title, max_results).await?;
        tracing::debug!(
            artist = %artist,
            title = %title,
            count = candidates.len(),
            "Match source returned candidates"
        );

        candidates.truncate(max_results);
        for candidate in &mut candidates {
            corroborate(track, candidate);
        }

        // Stable: equal scores keep provider order
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(candidates)
    }

    /// Best candidate, if its score reaches the confidence threshold
    pub async fn best_match(&self, track: &Track) -> Result<Option<MatchCandidate>> {
        let best = self
            .find_matches(track, self.pool_size)
            .await?
            .into_iter()
            .next();

        match best {
            Some(candidate) if candidate.score >= self.min_confidence => Ok(Some(candidate)),
            Some(candidate) => {
                tracing::debug!(
                    track = %track.display_name(),
                    score = candidate.score,
                    threshold = self.min_confidence,
                    "Best candidate below confidence threshold"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Produce an enriched copy of `track` from `candidate`
    ///
    /// Fields absent on the candidate keep the track's value. Duration,
    /// loudness, disc number and source are never taken from the candidate.
    pub fn apply(track: &Track, candidate: &MatchCandidate) -> Track {
        let mut enriched = track.clone();

        if !candidate.title.trim().is_empty() {
            enriched.title = candidate.title.clone();
        }
        if !candidate.artist.trim().is_empty() {
            enriched.artists = vec![candidate.artist.clone()];
        }
        if let Some(album) = candidate.album.as_ref().filter(|a| !a.trim().is_empty()) {
            enriched.album = album.clone();
        }
        if let Some(year) = candidate.year {
            enriched.year = year.to_string();
        }
        if let Some(number) = candidate.track_number {
            enriched.track_number = number;
        }
        if let Some(total) = candidate.total_tracks {
            enriched.total_tracks = total;
        }
        enriched.recording_id = Some(candidate.recording_id.clone());

        enriched
    }
}

fn corroborate(track: &Track, candidate: &mut MatchCandidate) {
    let album = track.album.trim();
    if !album.is_empty() {
        if let Some(candidate_album) = &candidate.album {
            if candidate_album.trim().to_lowercase() == album.to_lowercase() {
                candidate.boost(ALBUM_BOOST);
            }
        }
    }

    if let (Some(year), Some(candidate_year)) = (track.year_number(), candidate.year) {
        if year == candidate_year {
            candidate.boost(YEAR_BOOST);
        }
    }
}
