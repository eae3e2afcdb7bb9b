//! Integration tests for the background enrichment queue

mod test_helpers;

use medley_core::Track;
use medley_enrichment::{
    EnrichmentError, EnrichmentEvent, EnrichmentQueue, EnrichmentScorer, EventReceiver, RateLimiter,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_helpers::{
    candidate, init_tracing, track, FakeMatchSource, FolderCoverEmbedder, RecordingTagWriter,
};
use tokio::sync::Semaphore;

fn scorer_for(source: &Arc<FakeMatchSource>, interval: Duration) -> Arc<EnrichmentScorer> {
    Arc::new(EnrichmentScorer::new(
        source.clone(),
        Arc::new(RateLimiter::new(interval)),
    ))
}

async fn next_event(events: &mut EventReceiver) -> EnrichmentEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for enrichment event")
        .expect("event channel closed")
}

#[tokio::test]
async fn completed_event_carries_original_and_enriched() {
    init_tracing();

    let mut c = candidate("rec-1", "Paranoid Android", "Radiohead", 0.95);
    c.album = Some("OK Computer".to_string());
    c.year = Some(1997);
    let source = Arc::new(FakeMatchSource::new().with_candidates("paranoid android", vec![c]));

    let (queue, mut events) = EnrichmentQueue::start(scorer_for(&source, Duration::ZERO));
    let original = track("radiohead", "paranoid android");
    let job_id = queue.enqueue(original.clone(), false).unwrap();

    match next_event(&mut events).await {
        EnrichmentEvent::Completed {
            job_id: id,
            original: o,
            enriched,
            candidate,
        } => {
            assert_eq!(id, job_id);
            assert_eq!(o, original);
            assert_eq!(enriched.title, "Paranoid Android");
            assert_eq!(enriched.album, "OK Computer");
            assert_eq!(enriched.year, "1997");
            assert_eq!(candidate.recording_id, "rec-1");
        }
        other => panic!("expected Completed, got {:?}", other),
    }

    queue.shutdown().await;
}

#[tokio::test]
async fn no_confident_match_fails_job() {
    let source = Arc::new(
        FakeMatchSource::new().with_candidates("Song", vec![candidate("rec", "Song", "Artist", 0.4)]),
    );
    let (queue, mut events) = EnrichmentQueue::start(scorer_for(&source, Duration::ZERO));

    queue.enqueue(track("Artist", "Song"), false).unwrap();

    match next_event(&mut events).await {
        EnrichmentEvent::Failed { error, track, .. } => {
            assert!(error.contains("sufficient confidence"));
            assert_eq!(track.title, "Song");
        }
        other => panic!("expected Failed, got {:?}", other),
    }

    queue.shutdown().await;
}

#[tokio::test]
async fn source_error_fails_job_without_retry() {
    let source = Arc::new(FakeMatchSource::new().failing("Song"));
    let (queue, mut events) = EnrichmentQueue::start(scorer_for(&source, Duration::ZERO));

    queue.enqueue(track("Artist", "Song"), false).unwrap();

    match next_event(&mut events).await {
        EnrichmentEvent::Failed { error, .. } => assert!(error.contains("connection reset")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(source.calls().len(), 1);

    queue.shutdown().await;
}

#[tokio::test]
async fn jobs_complete_in_fifo_order() {
    init_tracing();

    let titles = ["One", "Two", "Three", "Four"];
    let mut source = FakeMatchSource::new();
    for title in titles {
        source = source.with_candidates(title, vec![candidate(title, title, "Artist", 0.9)]);
    }
    let source = Arc::new(source);

    // Enqueued faster than the limiter drains them
    let (queue, mut events) = EnrichmentQueue::start(scorer_for(&source, Duration::from_millis(50)));
    let ids = queue
        .enqueue_many(titles.iter().map(|t| track("Artist", t)), false)
        .unwrap();

    let mut completed = Vec::new();
    for _ in 0..titles.len() {
        completed.push(next_event(&mut events).await.job_id());
    }

    assert_eq!(completed, ids);
    let called: Vec<String> = source.calls().into_iter().map(|(_, title)| title).collect();
    assert_eq!(called, titles);

    queue.shutdown().await;
}

#[tokio::test]
async fn clear_drops_pending_jobs_only() {
    init_tracing();

    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(
        FakeMatchSource::new()
            .with_candidates("First", vec![candidate("first", "First", "Artist", 0.9)])
            .with_candidates("Second", vec![candidate("second", "Second", "Artist", 0.9)])
            .gated(gate.clone()),
    );
    let (queue, mut events) = EnrichmentQueue::start(scorer_for(&source, Duration::ZERO));

    let first = queue.enqueue(track("Artist", "First"), false).unwrap();
    source.wait_until_called().await;
    assert!(queue.is_processing());

    queue.enqueue(track("Artist", "Second"), false).unwrap();
    assert_eq!(queue.size(), 1);

    assert_eq!(queue.clear(), 1);
    assert_eq!(queue.size(), 0);

    // The in-flight job is unaffected
    gate.add_permits(1);
    assert_eq!(next_event(&mut events).await.job_id(), first);

    // Nothing fires for the cleared job
    let extra = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(extra.is_err(), "cleared job produced an event");
    assert_eq!(source.calls().len(), 1);

    queue.shutdown().await;
}

#[tokio::test]
async fn local_match_embeds_cover_and_writes_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("song.mp3");
    std::fs::write(&path, b"ID3").unwrap();

    let mut t = Track::local(&path);
    t.title = "Song".to_string();
    t.artists = vec!["Artist".to_string()];

    let mut c = candidate("rec-9", "Song", "Artist", 0.9);
    c.cover_art_url = Some("https://coverartarchive.org/release/abc/front-250".to_string());
    let source = Arc::new(FakeMatchSource::new().with_candidates("Song", vec![c]));

    let embedder = Arc::new(FolderCoverEmbedder::default());
    let writer = Arc::new(RecordingTagWriter::default());
    let (queue, mut events) = EnrichmentQueue::builder(scorer_for(&source, Duration::ZERO))
        .with_cover_art(embedder.clone())
        .with_tag_writer(writer.clone())
        .start();

    queue.enqueue(t, true).unwrap();

    match next_event(&mut events).await {
        EnrichmentEvent::Completed { enriched, .. } => {
            assert_eq!(enriched.cover_art_path, Some(dir.path().join("cover.jpg")));
            assert_eq!(enriched.recording_id.as_deref(), Some("rec-9"));
        }
        other => panic!("expected Completed, got {:?}", other),
    }

    assert_eq!(embedder.urls.lock().unwrap().len(), 1);
    assert_eq!(
        writer.writes.lock().unwrap().as_slice(),
        &[(path.clone(), "rec-9".to_string())]
    );

    queue.shutdown().await;
}

#[tokio::test]
async fn cover_art_is_skipped_when_not_requested() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("song.mp3");
    std::fs::write(&path, b"ID3").unwrap();

    let mut t = Track::local(&path);
    t.title = "Song".to_string();
    t.artists = vec!["Artist".to_string()];

    let mut c = candidate("rec", "Song", "Artist", 0.9);
    c.cover_art_url = Some("https://example.invalid/cover".to_string());
    let source = Arc::new(FakeMatchSource::new().with_candidates("Song", vec![c]));

    let embedder = Arc::new(FolderCoverEmbedder::default());
    let (queue, mut events) = EnrichmentQueue::builder(scorer_for(&source, Duration::ZERO))
        .with_cover_art(embedder.clone())
        .start();

    queue.enqueue(t, false).unwrap();
    assert!(matches!(next_event(&mut events).await, EnrichmentEvent::Completed { .. }));
    assert!(embedder.urls.lock().unwrap().is_empty());

    queue.shutdown().await;
}

#[tokio::test]
async fn streamed_track_never_touches_files() {
    let source = Arc::new(
        FakeMatchSource::new().with_candidates("Song", vec![candidate("rec", "Song", "Artist", 0.9)]),
    );
    let writer = Arc::new(RecordingTagWriter::default());
    let (queue, mut events) = EnrichmentQueue::builder(scorer_for(&source, Duration::ZERO))
        .with_tag_writer(writer.clone())
        .start();

    let mut t = Track::streamed("https://www.youtube.com/watch?v=xyz", Some("xyz".to_string())).unwrap();
    t.title = "Song".to_string();
    t.artists = vec!["Artist".to_string()];
    queue.enqueue(t, true).unwrap();

    match next_event(&mut events).await {
        EnrichmentEvent::Completed { enriched, .. } => {
            assert_eq!(enriched.source, streamed_source());
        }
        other => panic!("expected Completed, got {:?}", other),
    }
    assert!(writer.writes.lock().unwrap().is_empty());

    queue.shutdown().await;
}

fn streamed_source() -> medley_core::TrackSource {
    medley_core::TrackSource::Streamed {
        url: "https://www.youtube.com/watch?v=xyz".to_string(),
        platform_id: Some("xyz".to_string()),
    }
}

#[tokio::test]
async fn enqueue_after_shutdown_is_rejected() {
    let source = Arc::new(FakeMatchSource::new());
    let (queue, _events) = EnrichmentQueue::start(scorer_for(&source, Duration::ZERO));

    queue.shutdown().await;
    assert!(queue.is_shut_down());
    assert!(matches!(
        queue.enqueue(track("Artist", "Song"), false),
        Err(EnrichmentError::QueueShutDown)
    ));

    // Second shutdown is a no-op
    queue.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_bounded_by_grace_period() {
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(FakeMatchSource::new().gated(gate));
    let (queue, _events) = EnrichmentQueue::builder(scorer_for(&source, Duration::ZERO))
        .with_grace_period(Duration::from_millis(100))
        .start();

    queue.enqueue(track("Artist", "Stuck"), false).unwrap();
    source.wait_until_called().await;

    let started = std::time::Instant::now();
    queue.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!queue.is_processing());
}

#[tokio::test]
async fn shutdown_lets_in_flight_job_finish() {
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(
        FakeMatchSource::new()
            .with_candidates("Song", vec![candidate("rec", "Song", "Artist", 0.9)])
            .gated(gate.clone()),
    );
    let (queue, mut events) = EnrichmentQueue::builder(scorer_for(&source, Duration::ZERO))
        .with_grace_period(Duration::from_secs(5))
        .start();

    let id = queue.enqueue(track("Artist", "Song"), false).unwrap();
    source.wait_until_called().await;

    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.add_permits(1);
    });
    queue.shutdown().await;
    release.await.unwrap();

    assert_eq!(next_event(&mut events).await.job_id(), id);
}
