//! Directory and managed-library scanning
//!
//! Walks a tree, drives [`LibraryImporter`] for each file in order, and
//! collects a [`ScanResult`]. A managed-library scan also diffs the tree
//! against the catalog: vanished files are dropped as orphans, changed files
//! are refreshed, and misplaced files are flagged for reorganization.
//! Scanning only classifies; moving a flagged file is a separate call to
//! [`LibraryScanner::reorganize`].

use crate::config::ImportConfig;
use crate::importer::{ImportOutcome, LibraryImporter};
use crate::scanner::FileScanner;
use crate::transfer::{compute_file_hash, modified_seconds};
use crate::{ImportError, Result};
use medley_core::{needs_enrichment, Catalog, TagReader, Track, TrackSource};
use medley_enrichment::{find_cover_art, EnrichmentQueue};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress after each processed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// File name of the file just processed
    pub current_file: String,
    pub processed: usize,
    pub total: usize,
}

impl ScanProgress {
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}

/// Receives scan progress
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &ScanProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&ScanProgress) + Send + Sync,
{
    fn report(&self, progress: &ScanProgress) {
        self(progress)
    }
}

/// Progress sink that discards updates
pub fn no_progress(_: &ScanProgress) {}

/// A cataloged file whose path differs from its canonical one
#[derive(Debug, Clone)]
pub struct ReorganizeItem {
    pub track: Track,
    pub current: PathBuf,
    pub planned: PathBuf,
}

/// A file that could not be placed because different content occupies its
/// canonical path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConflict {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Outcome of one scan
///
/// Duplicates, conflicts and files needing metadata are counted as seen but
/// neither succeeded nor failed.
#[derive(Debug, Default, Clone)]
pub struct ScanResult {
    pub seen: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates: usize,
    /// Cataloged files refreshed because they changed on disk
    pub updated: usize,
    /// Catalog entries removed because their file is gone
    pub orphaned_entries: Vec<Track>,
    pub needs_enrichment: Vec<Track>,
    pub needs_reorganization: Vec<ReorganizeItem>,
    pub conflicts: Vec<FileConflict>,
    pub errors: Vec<String>,
}

impl ScanResult {
    fn record_error(&mut self, path: &Path, message: impl std::fmt::Display) {
        self.failed += 1;
        self.errors.push(format!("{}: {}", path.display(), message));
    }
}

pub struct LibraryScanner {
    importer: LibraryImporter,
    scanner: FileScanner,
    queue: Option<Arc<EnrichmentQueue>>,
    copy_instead_of_move: bool,
    auto_enrich: bool,
}

impl LibraryScanner {
    pub fn new(importer: LibraryImporter) -> Self {
        Self {
            importer,
            scanner: FileScanner::new(),
            queue: None,
            copy_instead_of_move: true,
            auto_enrich: false,
        }
    }

    /// Build a scanner with importer and file enumeration set up from config
    pub fn from_config(
        config: &ImportConfig,
        reader: Arc<dyn TagReader>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        let importer = LibraryImporter::new(config.library_root.clone(), reader, catalog)
            .with_verification(config.verify_copies);
        let scanner = FileScanner::new()
            .follow_links(config.follow_links)
            .with_extensions(config.extensions.iter().map(String::as_str));

        Self::new(importer)
            .with_file_scanner(scanner)
            .copy_instead_of_move(config.copy_files)
            .with_auto_enrich(config.auto_enrich)
    }

    pub fn with_file_scanner(mut self, scanner: FileScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Queue used by scans with auto-enrich
    pub fn with_enrichment_queue(mut self, queue: Arc<EnrichmentQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Enqueue tracks imported by [`Self::scan_directory`] that need enrichment
    ///
    /// Has no effect without a queue. Managed scans take the flag per call.
    pub fn with_auto_enrich(mut self, enabled: bool) -> Self {
        self.auto_enrich = enabled;
        self
    }

    /// Copy (default) or move files found by [`Self::scan_directory`]
    pub fn copy_instead_of_move(mut self, copy: bool) -> Self {
        self.copy_instead_of_move = copy;
        self
    }

    pub fn importer(&self) -> &LibraryImporter {
        &self.importer
    }

    fn catalog(&self) -> &Arc<dyn Catalog> {
        self.importer.catalog()
    }

    /// Import every audio file under `path` into the library
    pub async fn scan_directory(
        &self,
        path: &Path,
        progress: &impl ProgressSink,
    ) -> Result<ScanResult> {
        let start_time = Instant::now();
        let files = self.scanner.scan_directory(path)?;
        let total = files.len();
        info!("Scanning {} files in {}", total, path.display());

        let mut result = ScanResult::default();
        for (index, file) in files.iter().enumerate() {
            result.seen += 1;
            let outcome = self.importer.import(file, self.copy_instead_of_move).await;
            if let Some(track) = self.record_outcome(&mut result, file, outcome) {
                if needs_enrichment(&track) {
                    if self.auto_enrich {
                        self.enqueue(&mut result, &track);
                    }
                    result.needs_enrichment.push(track);
                }
            }
            report(progress, file, index + 1, total);
        }

        info!(
            "Scan of {} complete in {:?}: {} imported, {} duplicates, {} failed",
            path.display(),
            start_time.elapsed(),
            result.succeeded,
            result.duplicates,
            result.failed
        );
        Ok(result)
    }

    /// Reconcile the managed library tree at `path` with the catalog
    ///
    /// With `reorganize`, cataloged files away from their canonical path are
    /// listed in `needs_reorganization`. With `auto_enrich` and a queue
    /// attached, tracks needing enrichment are also enqueued.
    pub async fn scan_managed_library(
        &self,
        path: &Path,
        reorganize: bool,
        auto_enrich: bool,
        progress: &impl ProgressSink,
    ) -> Result<ScanResult> {
        let start_time = Instant::now();
        let files = self.scanner.scan_directory(path)?;
        let mut result = ScanResult::default();

        let mut known: HashMap<PathBuf, Track> = HashMap::new();
        for track in self.catalog().get_all().await? {
            let Some(file) = track.local_path().map(Path::to_path_buf) else {
                continue;
            };
            if !file.starts_with(path) {
                continue;
            }
            if file.exists() {
                known.insert(file, track);
            } else {
                self.remove_orphan(&mut result, &file, track).await;
            }
        }

        let total = files.len();
        info!(
            "Scanning managed library {}: {} files, {} cataloged",
            path.display(),
            total,
            known.len()
        );

        for (index, file) in files.iter().enumerate() {
            result.seen += 1;

            let track = match known.remove(file) {
                Some(existing) => self.check_cataloged(&mut result, file, existing).await,
                None => {
                    let outcome = self.importer.import_in_place(file).await;
                    let needs_metadata = matches!(outcome, ImportOutcome::NeedsMetadata { .. });
                    let track = self.record_outcome(&mut result, file, outcome);
                    if needs_metadata && auto_enrich {
                        if let Some(untagged) = result.needs_enrichment.last().cloned() {
                            self.enqueue(&mut result, &untagged);
                        }
                    }
                    track
                }
            };

            if let Some(track) = track {
                if reorganize {
                    self.classify_placement(&mut result, file, &track);
                }
                if needs_enrichment(&track) {
                    if auto_enrich {
                        self.enqueue(&mut result, &track);
                    }
                    result.needs_enrichment.push(track);
                }
            }

            report(progress, file, index + 1, total);
        }

        info!(
            "Managed scan of {} complete in {:?}: {} ok, {} updated, {} orphaned, {} to reorganize, {} failed",
            path.display(),
            start_time.elapsed(),
            result.succeeded,
            result.updated,
            result.orphaned_entries.len(),
            result.needs_reorganization.len(),
            result.failed
        );
        Ok(result)
    }

    async fn remove_orphan(&self, result: &mut ScanResult, file: &Path, track: Track) {
        let Some(id) = track.id else {
            return;
        };
        match self.catalog().delete(id).await {
            Ok(()) => {
                debug!(path = %file.display(), "Removed orphaned catalog entry");
                result.orphaned_entries.push(track);
            }
            Err(e) => result.errors.push(format!("{}: {}", file.display(), e)),
        }
    }

    /// Refresh a cataloged file if its modification time changed
    async fn check_cataloged(
        &self,
        result: &mut ScanResult,
        file: &Path,
        existing: Track,
    ) -> Option<Track> {
        let unchanged = matches!(modified_seconds(file), Ok(mtime) if mtime == existing.last_modified);
        if unchanged {
            result.succeeded += 1;
            return Some(existing);
        }

        match self.refresh_track(&existing).await {
            Ok(track) => {
                result.succeeded += 1;
                result.updated += 1;
                Some(track)
            }
            Err(e) => {
                result.record_error(file, e);
                None
            }
        }
    }

    /// Returns the cataloged track for outcomes that leave one
    fn record_outcome(
        &self,
        result: &mut ScanResult,
        file: &Path,
        outcome: ImportOutcome,
    ) -> Option<Track> {
        match outcome {
            ImportOutcome::Success { track, .. } => {
                result.succeeded += 1;
                Some(track)
            }
            ImportOutcome::Duplicate { .. } => {
                result.duplicates += 1;
                None
            }
            ImportOutcome::Conflict { source, target } => {
                result.conflicts.push(FileConflict { source, target });
                None
            }
            ImportOutcome::NeedsMetadata { source } => {
                result.needs_enrichment.push(self.untagged_track(&source));
                None
            }
            ImportOutcome::Error(message) => {
                result.record_error(file, message);
                None
            }
        }
    }

    fn untagged_track(&self, path: &Path) -> Track {
        let mut track = self
            .importer
            .reader()
            .read(path)
            .unwrap_or_else(|| Track::local(path));
        track.source = TrackSource::Local {
            path: path.to_path_buf(),
        };
        track
    }

    fn classify_placement(&self, result: &mut ScanResult, file: &Path, track: &Track) {
        let planned = self.importer.planner().plan(track);
        if planned != file {
            debug!(
                "Needs reorganization: {} -> {}",
                file.display(),
                planned.display()
            );
            result.needs_reorganization.push(ReorganizeItem {
                track: track.clone(),
                current: file.to_path_buf(),
                planned,
            });
        }
    }

    fn enqueue(&self, result: &mut ScanResult, track: &Track) {
        let Some(queue) = &self.queue else {
            return;
        };
        let fetch_cover_art = track.cover_art_path.is_none();
        if let Err(e) = queue.enqueue(track.clone(), fetch_cover_art) {
            warn!("Could not queue {} for enrichment: {}", track.source.location(), e);
            result.errors.push(format!("{}: {}", track.source.location(), e));
        }
    }

    /// Re-read a cataloged local track's tags and save it under the same id
    pub async fn refresh_track(&self, track: &Track) -> Result<Track> {
        let Some(path) = track.local_path() else {
            return Err(ImportError::InvalidPath(format!(
                "{} is not a local file",
                track.source.location()
            )));
        };
        if !path.is_file() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let mut refreshed = self
            .importer
            .reader()
            .read(path)
            .ok_or_else(|| ImportError::Metadata(format!("Unreadable tags: {}", path.display())))?;

        refreshed.id = track.id;
        refreshed.source = track.source.clone();
        if refreshed.recording_id.is_none() {
            refreshed.recording_id = track.recording_id.clone();
        }
        refreshed.last_modified = modified_seconds(path)?;
        refreshed.file_hash = Some(compute_file_hash(path)?);
        refreshed.cover_art_path = path.parent().and_then(find_cover_art);

        let id = self.catalog().save(&refreshed).await?;
        refreshed.id = Some(id);
        debug!(path = %path.display(), "Refreshed track");
        Ok(refreshed)
    }

    /// Refresh every cataloged local track
    pub async fn refresh_all(&self, progress: &impl ProgressSink) -> Result<ScanResult> {
        let tracks: Vec<Track> = self
            .catalog()
            .get_all()
            .await?
            .into_iter()
            .filter(|t| t.local_path().is_some())
            .collect();

        let total = tracks.len();
        let mut result = ScanResult::default();
        for (index, track) in tracks.iter().enumerate() {
            result.seen += 1;
            let path = track.local_path().unwrap_or_else(|| Path::new(""));
            match self.refresh_track(track).await {
                Ok(_) => {
                    result.succeeded += 1;
                    result.updated += 1;
                }
                Err(e) => {
                    warn!("Failed to refresh {}: {}", path.display(), e);
                    result.failed += 1;
                    result.errors.push(e.to_string());
                }
            }
            report(progress, path, index + 1, total);
        }

        info!("Refreshed {} of {} tracks", result.succeeded, total);
        Ok(result)
    }

    /// Move one flagged file to its canonical path
    pub async fn reorganize(&self, item: &ReorganizeItem) -> ImportOutcome {
        self.importer.reorganize(&item.track).await
    }
}

fn report(progress: &impl ProgressSink, file: &Path, processed: usize, total: usize) {
    progress.report(&ScanProgress {
        current_file: file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        processed,
        total,
    });
}
