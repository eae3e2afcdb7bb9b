//! Medley Enrichment
//!
//! Fills in missing track metadata from an external match source.
//!
//! # Architecture
//!
//! - [`RateLimiter`]: strict minimum gap between outbound lookups, shared by
//!   every caller
//! - [`EnrichmentScorer`]: queries the [`MatchSource`](medley_core::MatchSource),
//!   boosts corroborated candidates and picks the best one above a threshold
//! - [`EnrichmentQueue`]: single background worker that processes jobs in
//!   FIFO order and reports [`EnrichmentEvent`]s
//! - [`MusicBrainzClient`]: `MatchSource` backed by the MusicBrainz web service
//! - [`HttpCoverArtEmbedder`] / [`find_cover_art`]: cover art download,
//!   embedding and discovery
//!
//! # Example
//!
//! ```rust,no_run
//! use medley_enrichment::{EnrichmentConfig, EnrichmentQueue, EnrichmentScorer, MusicBrainzClient, RateLimiter};
//! use std::sync::Arc;
//!
//! # async fn example(track: medley_core::Track) -> medley_enrichment::Result<()> {
//! let config = EnrichmentConfig::default();
//! let source = Arc::new(MusicBrainzClient::new(&config)?);
//! let limiter = Arc::new(RateLimiter::new(config.rate_limit()));
//! let scorer = Arc::new(EnrichmentScorer::from_config(source, limiter, &config));
//!
//! let (queue, mut events) = EnrichmentQueue::builder(scorer)
//!     .with_grace_period(config.shutdown_grace())
//!     .start();
//! queue.enqueue(track, true)?;
//!
//! if let Some(event) = events.recv().await {
//!     println!("job {} finished", event.job_id());
//! }
//! queue.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod cover_art;
pub mod error;
pub mod musicbrainz;
pub mod queue;
pub mod rate_limiter;
pub mod scorer;

pub use config::EnrichmentConfig;
pub use cover_art::{find_cover_art, HttpCoverArtEmbedder};
pub use error::{EnrichmentError, Result};
pub use musicbrainz::MusicBrainzClient;
pub use queue::{
    EnrichmentEvent, EnrichmentJob, EnrichmentQueue, EnrichmentQueueBuilder, EventReceiver, JobId,
};
pub use rate_limiter::RateLimiter;
pub use scorer::EnrichmentScorer;
