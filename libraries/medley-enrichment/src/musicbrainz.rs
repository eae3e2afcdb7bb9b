//! MusicBrainz match source
//!
//! Implements [`MatchSource`] on top of the MusicBrainz web service (v2, JSON).
//! The client does not throttle itself; share one [`RateLimiter`] through the
//! [`EnrichmentScorer`] instead.
//!
//! [`RateLimiter`]: crate::RateLimiter
//! [`EnrichmentScorer`]: crate::EnrichmentScorer

use crate::config::EnrichmentConfig;
use crate::error::Result;
use async_trait::async_trait;
use medley_core::{MatchCandidate, MatchSource, MedleyError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::cmp::Reverse;

/// Genres kept per candidate, most voted first
const MAX_GENRES: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

#[derive(Debug, Deserialize)]
struct MbRecording {
    id: String,
    title: String,
    /// 0-100, only present on search results
    score: Option<u32>,
    #[serde(default)]
    disambiguation: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    releases: Vec<MbRelease>,
    #[serde(default)]
    tags: Vec<MbTag>,
}

#[derive(Debug, Deserialize)]
struct MbArtistCredit {
    name: String,
    artist: MbArtist,
}

#[derive(Debug, Deserialize)]
struct MbArtist {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MbRelease {
    id: String,
    title: String,
    date: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    disambiguation: Option<String>,
    #[serde(default)]
    media: Vec<MbMedium>,
}

#[derive(Debug, Deserialize)]
struct MbMedium {
    #[serde(rename = "track-count")]
    track_count: Option<i32>,
    #[serde(default, alias = "tracks")]
    track: Vec<MbTrack>,
}

#[derive(Debug, Deserialize)]
struct MbTrack {
    number: Option<String>,
    position: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct MbTag {
    name: String,
    #[serde(default)]
    count: Option<i32>,
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http: Client,
    base_url: String,
    cover_art_url: String,
}

impl MusicBrainzClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.musicbrainz_url.trim_end_matches('/').to_string(),
            cover_art_url: config.cover_art_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> medley_core::Result<Option<T>> {
        tracing::debug!(url = %url, "Querying MusicBrainz API");

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| MedleyError::network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MedleyError::ExternalService {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .json()
            .await
            .map_err(|e| MedleyError::network(format!("Invalid MusicBrainz response: {}", e)))?;
        Ok(Some(body))
    }

    fn to_candidate(&self, recording: MbRecording) -> MatchCandidate {
        // Lookups carry no score: the id was asked for explicitly
        let score = recording.score.map_or(1.0, |s| f64::from(s.min(100)) / 100.0);

        let mut candidate = MatchCandidate::new(recording.id, recording.title, "", score);

        if let Some(credit) = recording.artist_credit.into_iter().next() {
            candidate.artist = credit.name;
            candidate.artist_id = Some(credit.artist.id);
        }

        // Best ranked release wins, earliest year breaks ties
        let release = recording.releases.into_iter().min_by_key(|r| {
            (
                Reverse(release_preference(r)),
                r.date.as_deref().and_then(parse_year).unwrap_or(9999),
            )
        });

        if let Some(release) = release {
            tracing::debug!(release_id = %release.id, album = %release.title, "Selected release");
            candidate.year = release.date.as_deref().and_then(parse_year);
            if let Some(medium) = release.media.first() {
                candidate.total_tracks = medium.track_count;
                candidate.track_number = medium.track.first().and_then(|t| {
                    t.number
                        .as_deref()
                        .and_then(|n| n.trim().parse().ok())
                        .or(t.position)
                });
            }
            candidate.cover_art_url = Some(format!(
                "{}/release/{}/front-250",
                self.cover_art_url, release.id
            ));
            candidate.album = Some(release.title);
            candidate.release_id = Some(release.id);
        }

        let mut tags = recording.tags;
        tags.sort_by_key(|t| Reverse(t.count.unwrap_or(0)));
        candidate.genres = tags.into_iter().take(MAX_GENRES).map(|t| t.name).collect();
        candidate.disambiguation = recording.disambiguation.filter(|d| !d.is_empty());

        candidate
    }
}

#[async_trait]
impl MatchSource for MusicBrainzClient {
    async fn search(&self, artist: &str, title: &str, limit: usize) -> medley_core::Result<Vec<MatchCandidate>> {
        let query = format!(
            "recording:\"{}\" AND artist:\"{}\"",
            escape_query(title),
            escape_query(artist)
        );
        let url = format!("{}/recording", self.base_url);

        let response: Option<SearchResponse> = self
            .get_json(
                &url,
                &[
                    ("query", query),
                    ("limit", limit.clamp(1, 100).to_string()),
                    ("fmt", "json".to_string()),
                ],
            )
            .await?;

        let candidates: Vec<MatchCandidate> = response
            .map(|r| r.recordings)
            .unwrap_or_default()
            .into_iter()
            .map(|r| self.to_candidate(r))
            .collect();

        tracing::info!(
            artist = %artist,
            title = %title,
            count = candidates.len(),
            "Retrieved recordings from MusicBrainz"
        );

        Ok(candidates)
    }

    async fn lookup(&self, recording_id: &str) -> medley_core::Result<Option<MatchCandidate>> {
        let url = format!("{}/recording/{}", self.base_url, recording_id);

        let recording: Option<MbRecording> = self
            .get_json(
                &url,
                &[
                    ("inc", "artist-credits+releases+media+tags".to_string()),
                    ("fmt", "json".to_string()),
                ],
            )
            .await?;

        Ok(recording.map(|r| self.to_candidate(r)))
    }
}

/// Escape Lucene special characters inside a quoted phrase
fn escape_query(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Year from a MusicBrainz date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`)
fn parse_year(date: &str) -> Option<i32> {
    date.get(..4).and_then(|y| y.parse().ok())
}

/// Ranks a release: official studio releases first, live bootlegs last
fn release_preference(release: &MbRelease) -> i32 {
    let mut preference = 0;

    if release
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("official"))
    {
        preference += 1000;
    }

    let title = release.title.to_lowercase();
    let disambiguation = release
        .disambiguation
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let is_live = ["live", "concert"]
        .iter()
        .any(|w| title.contains(w) || disambiguation.contains(w));
    // "1991-10-31: Seattle, WA" style disambiguations mark concert recordings
    let is_dated_venue = disambiguation.contains(": ") && disambiguation.contains(", ");
    if is_live || is_dated_venue {
        preference -= 500;
    }

    if disambiguation.is_empty() {
        preference += 100;
    }

    if let Some(year) = release.date.as_deref().and_then(parse_year) {
        preference += (50 - (year - 1900)).max(0);
    }

    preference
}
