//! Shared fakes for enrichment integration tests

use async_trait::async_trait;
use medley_core::{CoverArtEmbedder, MatchCandidate, MatchSource, MedleyError, TagWriter, Track};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::{Notify, Semaphore};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Local track with artist and title set
pub fn track(artist: &str, title: &str) -> Track {
    let mut track = Track::local(format!("/music/inbox/{} - {}.mp3", artist, title));
    track.title = title.to_string();
    track.artists = vec![artist.to_string()];
    track
}

pub fn candidate(recording_id: &str, title: &str, artist: &str, score: f64) -> MatchCandidate {
    MatchCandidate::new(recording_id, title, artist, score)
}

/// Match source answering from a per-title table
#[derive(Default)]
pub struct FakeMatchSource {
    candidates: HashMap<String, Vec<MatchCandidate>>,
    failures: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
    gate: Option<Arc<Semaphore>>,
    entered: Notify,
}

impl FakeMatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(mut self, title: &str, candidates: Vec<MatchCandidate>) -> Self {
        self.candidates.insert(title.to_string(), candidates);
        self
    }

    /// Searches for `title` fail with a network error
    pub fn failing(mut self, title: &str) -> Self {
        self.failures.insert(title.to_string());
        self
    }

    /// Every search blocks until a permit is added to `gate`
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// (artist, title) of every search, in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Resolves once a search has started
    pub async fn wait_until_called(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl MatchSource for FakeMatchSource {
    async fn search(&self, artist: &str, title: &str, _limit: usize) -> medley_core::Result<Vec<MatchCandidate>> {
        self.calls
            .lock()
            .unwrap()
            .push((artist.to_string(), title.to_string()));
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        if self.failures.contains(title) {
            return Err(MedleyError::network("connection reset by peer"));
        }

        Ok(self.candidates.get(title).cloned().unwrap_or_default())
    }
}

/// Tag writer that records what it was asked to write
#[derive(Default)]
pub struct RecordingTagWriter {
    pub writes: Mutex<Vec<(PathBuf, String)>>,
}

impl TagWriter for RecordingTagWriter {
    fn write_external_ids(&self, path: &Path, candidate: &MatchCandidate) -> bool {
        self.writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), candidate.recording_id.clone()));
        true
    }
}

/// Embedder that drops a `cover.jpg` next to the file
#[derive(Default)]
pub struct FolderCoverEmbedder {
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl CoverArtEmbedder for FolderCoverEmbedder {
    async fn embed_from_url(&self, path: &Path, url: &str) -> bool {
        self.urls.lock().unwrap().push(url.to_string());
        match path.parent() {
            Some(dir) => std::fs::write(dir.join("cover.jpg"), b"\xFF\xD8\xFF").is_ok(),
            None => false,
        }
    }
}
