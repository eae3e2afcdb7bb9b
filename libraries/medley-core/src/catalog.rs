//! In-memory catalog
//!
//! A `Catalog` backed by a map, for embedding the pipeline without a database
//! and for tests. Persistent catalogs live in the host application.

use crate::error::{MedleyError, Result};
use crate::traits::Catalog;
use crate::types::{Track, TrackId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    tracks: BTreeMap<TrackId, Track>,
    next_id: TrackId,
}

/// Catalog held in memory, keyed by id in insertion order
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cataloged tracks
    pub fn len(&self) -> usize {
        self.lock().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn save(&self, track: &Track) -> Result<TrackId> {
        let mut inner = self.lock();

        // An explicit id wins so that moving a file keeps its record
        let existing = match track.id {
            Some(id) if inner.tracks.contains_key(&id) => Some(id),
            _ => inner
                .tracks
                .iter()
                .find(|(_, t)| t.source == track.source)
                .map(|(id, _)| *id),
        };

        let id = match existing {
            Some(id) => id,
            None => {
                inner.next_id += 1;
                inner.next_id
            }
        };

        let mut stored = track.clone();
        stored.id = Some(id);
        inner.tracks.insert(id, stored);

        tracing::debug!(id, location = %track.source.location(), "Saved track");
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<Track>> {
        Ok(self.lock().tracks.values().cloned().collect())
    }

    async fn get_by_path(&self, path: &Path) -> Result<Option<Track>> {
        Ok(self
            .lock()
            .tracks
            .values()
            .find(|t| t.local_path() == Some(path))
            .cloned())
    }

    async fn delete(&self, id: TrackId) -> Result<()> {
        self.lock()
            .tracks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| MedleyError::not_found("Track", id.to_string()))
    }
}
