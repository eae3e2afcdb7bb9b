//! Single-file import into the managed library
//!
//! Reads tags, rejects duplicates, plans the canonical path, resolves target
//! collisions, transfers the file and persists the track. Per-file problems
//! are reported as an [`ImportOutcome`], never as an `Err`.

use crate::duplicates::{ConflictResolution, DuplicateBasis, DuplicateCheck, DuplicateDetector};
use crate::path_planner::PathPlanner;
use crate::transfer::{copy_file_verified, modified_seconds, move_file, remove_empty_ancestors};
use crate::{ImportError, Result};
use medley_core::{needs_enrichment, Catalog, TagReader, Track, TrackSource};
use medley_enrichment::find_cover_art;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of importing one file
///
/// Exactly one variant applies; callers match on it rather than probing
/// fields.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    /// File is in the library and cataloged
    Success {
        track: Track,
        target: PathBuf,
        needs_enrichment: bool,
    },
    /// Already in the library; nothing was changed on disk
    Duplicate { existing: Track, basis: DuplicateBasis },
    /// A different file occupies the canonical path
    Conflict { source: PathBuf, target: PathBuf },
    /// Tags are unreadable or empty
    NeedsMetadata { source: PathBuf },
    Error(String),
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Success { .. })
    }
}

/// How the file reaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Copy,
    Move,
    /// Already inside the library; catalog it where it is
    InPlace,
}

pub struct LibraryImporter {
    planner: PathPlanner,
    reader: Arc<dyn TagReader>,
    catalog: Arc<dyn Catalog>,
    detector: DuplicateDetector,
    verify_copies: bool,
}

impl LibraryImporter {
    pub fn new(
        library_root: impl Into<PathBuf>,
        reader: Arc<dyn TagReader>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            planner: PathPlanner::new(library_root),
            reader,
            catalog,
            detector: DuplicateDetector::new(),
            verify_copies: true,
        }
    }

    /// Hash-verify copied files (on by default)
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_copies = verify;
        self
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn library_root(&self) -> &Path {
        self.planner.library_root()
    }

    pub fn reader(&self) -> &Arc<dyn TagReader> {
        &self.reader
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Import `source` into the library by copying or moving it
    pub async fn import(&self, source: &Path, copy_instead_of_move: bool) -> ImportOutcome {
        let transfer = if copy_instead_of_move {
            Transfer::Copy
        } else {
            Transfer::Move
        };
        self.import_with(source, transfer).await
    }

    /// Catalog a file that already lives in the library, without moving it
    pub async fn import_in_place(&self, path: &Path) -> ImportOutcome {
        self.import_with(path, Transfer::InPlace).await
    }

    async fn import_with(&self, source: &Path, transfer: Transfer) -> ImportOutcome {
        match self.try_import(source, transfer).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to import file {}: {}", source.display(), e);
                ImportOutcome::Error(e.to_string())
            }
        }
    }

    async fn try_import(&self, source: &Path, transfer: Transfer) -> Result<ImportOutcome> {
        if !source.is_file() {
            return Ok(ImportOutcome::Error(
                ImportError::FileNotFound(source.display().to_string()).to_string(),
            ));
        }

        let Some(mut track) = self.reader.read(source).filter(|t| !t.is_untagged()) else {
            debug!(path = %source.display(), "No usable tags");
            return Ok(ImportOutcome::NeedsMetadata {
                source: source.to_path_buf(),
            });
        };
        track.id = None;
        track.source = TrackSource::Local {
            path: source.to_path_buf(),
        };

        let catalog = self.catalog.get_all().await?;
        let content_hash = match self.detector.check(source, &track, &catalog)? {
            DuplicateCheck::Duplicate { existing, basis } => {
                info!(
                    "Duplicate ({}): {} matches {}",
                    basis,
                    source.display(),
                    existing.source.location()
                );
                return Ok(ImportOutcome::Duplicate { existing, basis });
            }
            DuplicateCheck::Unique { content_hash } => content_hash,
        };

        let target = match transfer {
            Transfer::InPlace => source.to_path_buf(),
            Transfer::Copy | Transfer::Move => self.planner.plan(&track),
        };

        if target != source {
            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir)?;
            }

            if target.exists() {
                match self.detector.resolve_conflict(source, &target)? {
                    ConflictResolution::Identical => {
                        info!("Identical file already at {}, keeping it", target.display());
                    }
                    ConflictResolution::NeedsDecision => {
                        warn!("File already exists at target location: {}", target.display());
                        return Ok(ImportOutcome::Conflict {
                            source: source.to_path_buf(),
                            target,
                        });
                    }
                }
            } else if let Err(e) = self.transfer(source, &target, transfer) {
                if let Some(dir) = target.parent() {
                    remove_empty_ancestors(dir, self.library_root());
                }
                return Err(e);
            }
        }

        track.file_hash = Some(content_hash);
        let outcome = self.persist_at(track, &target).await?;
        info!("Imported file: {} -> {}", source.display(), target.display());
        Ok(outcome)
    }

    fn transfer(&self, source: &Path, target: &Path, transfer: Transfer) -> Result<()> {
        match transfer {
            Transfer::Copy => copy_file_verified(source, target, self.verify_copies),
            Transfer::Move => {
                move_file(source, target)?;
                if let Some(dir) = source.parent() {
                    remove_empty_ancestors(dir, self.library_root());
                }
                Ok(())
            }
            Transfer::InPlace => Ok(()),
        }
    }

    /// Point `track` at `path`, refresh file-derived fields and save it
    async fn persist_at(&self, mut track: Track, path: &Path) -> Result<ImportOutcome> {
        track.source = TrackSource::Local {
            path: path.to_path_buf(),
        };
        track.last_modified = modified_seconds(path)?;
        if track.cover_art_path.is_none() {
            track.cover_art_path = path.parent().and_then(find_cover_art);
        }

        let id = self.catalog.save(&track).await?;
        track.id = Some(id);

        Ok(ImportOutcome::Success {
            needs_enrichment: needs_enrichment(&track),
            target: path.to_path_buf(),
            track,
        })
    }

    /// Move a cataloged track to its canonical path
    ///
    /// The catalog record keeps its id. A byte-identical file already at the
    /// canonical path is kept and the record repointed to it; a different one
    /// yields `Conflict`.
    pub async fn reorganize(&self, track: &Track) -> ImportOutcome {
        match self.try_reorganize(track).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to reorganize {}: {}", track.source.location(), e);
                ImportOutcome::Error(e.to_string())
            }
        }
    }

    async fn try_reorganize(&self, track: &Track) -> Result<ImportOutcome> {
        let Some(current) = track.local_path() else {
            return Err(ImportError::InvalidPath(format!(
                "{} is not a local file",
                track.source.location()
            )));
        };
        if !current.is_file() {
            return Err(ImportError::FileNotFound(current.display().to_string()));
        }

        let mut track = track.clone();
        if track.id.is_none() {
            track.id = self.catalog.get_by_path(current).await?.and_then(|t| t.id);
        }

        let target = self.planner.plan(&track);
        if target == current {
            return Ok(ImportOutcome::Success {
                needs_enrichment: needs_enrichment(&track),
                target,
                track,
            });
        }

        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }

        let current = current.to_path_buf();
        if target.exists() {
            match self.detector.resolve_conflict(&current, &target)? {
                ConflictResolution::Identical => {
                    info!("Identical file already at {}, keeping it", target.display());
                }
                ConflictResolution::NeedsDecision => {
                    return Ok(ImportOutcome::Conflict {
                        source: current,
                        target,
                    });
                }
            }
        } else {
            move_file(&current, &target)?;
            if let Some(dir) = current.parent() {
                remove_empty_ancestors(dir, self.library_root());
            }
        }

        let outcome = self.persist_at(track, &target).await?;
        info!("Reorganized: {} -> {}", current.display(), target.display());
        Ok(outcome)
    }
}
