/// Enrichment configuration
use crate::error::{EnrichmentError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    /// Minimum gap between two external lookups
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Candidates below this score are never applied
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Candidates requested per lookup
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// How long `shutdown()` waits for an in-flight job
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    #[serde(default = "default_musicbrainz_url")]
    pub musicbrainz_url: String,

    #[serde(default = "default_cover_art_url")]
    pub cover_art_url: String,

    /// MusicBrainz rejects anonymous clients
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit_ms(),
            min_confidence: default_min_confidence(),
            max_results: default_max_results(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            musicbrainz_url: default_musicbrainz_url(),
            cover_art_url: default_cover_art_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EnrichmentConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(EnrichmentError::InvalidConfig(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }

        if self.max_results == 0 {
            return Err(EnrichmentError::InvalidConfig(
                "max_results must be at least 1".to_string(),
            ));
        }

        for (name, url) in [
            ("musicbrainz_url", &self.musicbrainz_url),
            ("cover_art_url", &self.cover_art_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(EnrichmentError::InvalidConfig(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        if self.user_agent.trim().is_empty() {
            return Err(EnrichmentError::InvalidConfig(
                "user_agent is required by MusicBrainz".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_min_confidence() -> f64 {
    crate::scorer::DEFAULT_MIN_CONFIDENCE
}

fn default_max_results() -> usize {
    crate::scorer::BEST_MATCH_POOL
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

fn default_musicbrainz_url() -> String {
    "https://musicbrainz.org/ws/2".to_string()
}

fn default_cover_art_url() -> String {
    "https://coverartarchive.org".to_string()
}

fn default_user_agent() -> String {
    format!("Medley/{} ( https://github.com/medley-audio/medley )", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EnrichmentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limit(), Duration::from_secs(1));
        assert_eq!(config.min_confidence, 0.70);
        assert_eq!(config.max_results, 5);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EnrichmentConfig =
            serde_json::from_str(r#"{ "rate_limit_ms": 250 }"#).unwrap();
        assert_eq!(config.rate_limit_ms, 250);
        assert_eq!(config.musicbrainz_url, "https://musicbrainz.org/ws/2");
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let config = EnrichmentConfig {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EnrichmentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let config = EnrichmentConfig {
            musicbrainz_url: "ftp://musicbrainz.org".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
