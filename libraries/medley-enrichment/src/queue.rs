//! Background enrichment queue
//!
//! A single worker task drains jobs in FIFO order. Each job runs the scorer
//! (which goes through the shared rate limiter), applies the best match and
//! reports the outcome on an event channel. Jobs are never retried; callers
//! re-enqueue if they want another attempt.

use crate::cover_art::find_cover_art;
use crate::error::{EnrichmentError, Result};
use crate::scorer::EnrichmentScorer;
use chrono::{DateTime, Utc};
use medley_core::{CoverArtEmbedder, MatchCandidate, TagWriter, Track};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Unique per enqueue, increasing in enqueue order
pub type JobId = u64;

/// How long `shutdown()` waits for an in-flight job by default
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A queued request to enrich one track
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub id: JobId,
    /// Snapshot taken at enqueue time
    pub track: Track,
    pub fetch_cover_art: bool,
    pub enqueued_at: DateTime<Utc>,
}

/// Terminal outcome of a job, delivered exactly once per processed job
#[derive(Debug, Clone)]
pub enum EnrichmentEvent {
    Completed {
        job_id: JobId,
        original: Track,
        enriched: Track,
        candidate: MatchCandidate,
    },
    Failed {
        job_id: JobId,
        track: Track,
        error: String,
    },
}

impl EnrichmentEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            EnrichmentEvent::Completed { job_id, .. } | EnrichmentEvent::Failed { job_id, .. } => {
                *job_id
            }
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<EnrichmentEvent>;

/// State shared between the queue handle and its worker
struct Shared {
    pending: Mutex<VecDeque<EnrichmentJob>>,
    available: Notify,
    processing: AtomicBool,
    cancel: CancellationToken,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, VecDeque<EnrichmentJob>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dequeue the next job, waiting until one is available
    async fn next_job(&self) -> EnrichmentJob {
        loop {
            {
                let mut pending = self.pending();
                if let Some(job) = pending.pop_front() {
                    // Marked under the lock so size() + is_processing() never both read idle
                    self.processing.store(true, Ordering::SeqCst);
                    return job;
                }
            }
            self.available.notified().await;
        }
    }
}

/// Everything the worker needs to process a job
struct Worker {
    scorer: Arc<EnrichmentScorer>,
    embedder: Option<Arc<dyn CoverArtEmbedder>>,
    tag_writer: Option<Arc<dyn TagWriter>>,
    events: mpsc::UnboundedSender<EnrichmentEvent>,
}

impl Worker {
    async fn run(self, shared: Arc<Shared>) {
        tracing::info!("Enrichment worker started");

        loop {
            let job = tokio::select! {
                biased;
                () = shared.cancel.cancelled() => break,
                job = shared.next_job() => job,
            };

            // Not cancellable mid-job: the lookup is allowed to finish
            let event = self.process(job).await;
            shared.processing.store(false, Ordering::SeqCst);

            if self.events.send(event).is_err() {
                tracing::debug!("Enrichment event receiver dropped");
            }
        }

        tracing::info!("Enrichment worker stopped");
    }

    async fn process(&self, job: EnrichmentJob) -> EnrichmentEvent {
        let EnrichmentJob {
            id: job_id,
            track,
            fetch_cover_art,
            ..
        } = job;

        tracing::debug!(job_id, track = %track.display_name(), "Processing enrichment job");

        match self.scorer.best_match(&track).await {
            Ok(Some(candidate)) => {
                let mut enriched = EnrichmentScorer::apply(&track, &candidate);

                if let Some(path) = track.local_path() {
                    if fetch_cover_art {
                        self.attach_cover_art(path, &candidate, &mut enriched).await;
                    }
                    self.write_external_ids(path, &candidate);
                }

                tracing::info!(
                    job_id,
                    track = %enriched.display_name(),
                    score = candidate.score,
                    "Enriched track"
                );

                EnrichmentEvent::Completed {
                    job_id,
                    original: track,
                    enriched,
                    candidate,
                }
            }
            Ok(None) => EnrichmentEvent::Failed {
                job_id,
                track,
                error: "No match with sufficient confidence".to_string(),
            },
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Enrichment lookup failed");
                EnrichmentEvent::Failed {
                    job_id,
                    track,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn attach_cover_art(&self, path: &Path, candidate: &MatchCandidate, enriched: &mut Track) {
        if let (Some(embedder), Some(url)) = (&self.embedder, &candidate.cover_art_url) {
            if !embedder.embed_from_url(path, url).await {
                tracing::warn!(path = %path.display(), "Cover art was not embedded");
            }
        }

        if let Some(cover) = path.parent().and_then(find_cover_art) {
            enriched.cover_art_path = Some(cover);
        }
    }

    fn write_external_ids(&self, path: &Path, candidate: &MatchCandidate) {
        if let Some(writer) = &self.tag_writer {
            if !writer.write_external_ids(path, candidate) {
                tracing::warn!(path = %path.display(), "Failed to write matched tags");
            }
        }
    }
}

/// Builder for [`EnrichmentQueue`]
pub struct EnrichmentQueueBuilder {
    scorer: Arc<EnrichmentScorer>,
    embedder: Option<Arc<dyn CoverArtEmbedder>>,
    tag_writer: Option<Arc<dyn TagWriter>>,
    grace_period: Duration,
}

impl EnrichmentQueueBuilder {
    /// Fetch and embed cover art for jobs that ask for it
    pub fn with_cover_art(mut self, embedder: Arc<dyn CoverArtEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Write external ids into local files after a match
    pub fn with_tag_writer(mut self, writer: Arc<dyn TagWriter>) -> Self {
        self.tag_writer = Some(writer);
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Spawn the worker on the current tokio runtime
    pub fn start(self) -> (EnrichmentQueue, EventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            pending: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            processing: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        });

        let worker = Worker {
            scorer: self.scorer,
            embedder: self.embedder,
            tag_writer: self.tag_writer,
            events,
        };
        let handle = tokio::spawn(worker.run(Arc::clone(&shared)));

        let queue = EnrichmentQueue {
            shared,
            next_id: AtomicU64::new(1),
            worker: Mutex::new(Some(handle)),
            grace_period: self.grace_period,
        };

        (queue, receiver)
    }
}

/// Cancellable single-worker enrichment queue
pub struct EnrichmentQueue {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
    grace_period: Duration,
}

impl EnrichmentQueue {
    pub fn builder(scorer: Arc<EnrichmentScorer>) -> EnrichmentQueueBuilder {
        EnrichmentQueueBuilder {
            scorer,
            embedder: None,
            tag_writer: None,
            grace_period: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Start a queue with no cover art or tag writing
    pub fn start(scorer: Arc<EnrichmentScorer>) -> (Self, EventReceiver) {
        Self::builder(scorer).start()
    }

    /// Queue a track for enrichment
    ///
    /// # Errors
    /// `QueueShutDown` once `shutdown()` has been called
    pub fn enqueue(&self, track: Track, fetch_cover_art: bool) -> Result<JobId> {
        if self.shared.cancel.is_cancelled() {
            return Err(EnrichmentError::QueueShutDown);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(job_id = id, track = %track.display_name(), "Queued enrichment job");

        self.shared.pending().push_back(EnrichmentJob {
            id,
            track,
            fetch_cover_art,
            enqueued_at: Utc::now(),
        });
        self.shared.available.notify_one();

        Ok(id)
    }

    /// Queue several tracks, preserving their order
    pub fn enqueue_many<I>(&self, tracks: I, fetch_cover_art: bool) -> Result<Vec<JobId>>
    where
        I: IntoIterator<Item = Track>,
    {
        tracks
            .into_iter()
            .map(|track| self.enqueue(track, fetch_cover_art))
            .collect()
    }

    /// Drop every job not yet picked up by the worker
    ///
    /// The in-flight job, if any, still completes. Returns the number of
    /// dropped jobs.
    pub fn clear(&self) -> usize {
        let mut pending = self.shared.pending();
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "Cleared enrichment queue");
        }
        dropped
    }

    /// Jobs waiting to be processed
    pub fn size(&self) -> usize {
        self.shared.pending().len()
    }

    /// Whether the worker is processing a job right now
    pub fn is_processing(&self) -> bool {
        self.shared.processing.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Stop the worker
    ///
    /// Pending jobs are discarded. An in-flight job gets the grace period to
    /// finish; after that the worker is aborted. Calling this twice is a no-op.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };

        let discarded = self.clear();
        if discarded > 0 {
            tracing::info!(discarded, "Discarded pending enrichment jobs on shutdown");
        }

        let abort = handle.abort_handle();
        match tokio::time::timeout(self.grace_period, handle).await {
            Ok(Ok(())) => tracing::info!("Enrichment queue shut down"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Enrichment worker ended abnormally"),
            Err(_) => {
                tracing::warn!(
                    grace_ms = self.grace_period.as_millis() as u64,
                    "Enrichment worker did not stop in time, aborting"
                );
                abort.abort();
                self.shared.processing.store(false, Ordering::SeqCst);
            }
        }
    }
}

impl Drop for EnrichmentQueue {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
