//! Medley library importer
//!
//! Brings audio files into a canonically organized library tree and keeps
//! the catalog in step with what is on disk.
//!
//! # Features
//!
//! - Canonical `Artist/Year - Album/NN - Title.ext` paths with sanitized components
//! - Duplicate detection by content hash, then by artist/title/album
//! - Copy or move into the library, with empty-folder cleanup after moves
//! - Managed-library scans: orphan removal, change refresh, reorganization flags
//! - Hand-off of incomplete tracks to the enrichment queue
//!
//! # Architecture
//!
//! - `path_planner`: Track metadata to canonical path
//! - `duplicates`: Duplicate and target-conflict detection
//! - `transfer`: Hashing, verified copy, move, empty-directory cleanup
//! - `scanner`: Filesystem enumeration of audio files
//! - `metadata`: lofty-backed tag reader and writer
//! - `importer`: Single-file import and reorganization
//! - `library_scanner`: Directory and managed-library scans
//! - `config`: File and environment configuration
//!
//! # Example
//!
//! ```no_run
//! use medley_core::MemoryCatalog;
//! use medley_importer::{no_progress, LibraryImporter, LibraryScanner, LoftyTagReader};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> medley_importer::Result<()> {
//! let importer = LibraryImporter::new(
//!     "/srv/music",
//!     Arc::new(LoftyTagReader::new()),
//!     Arc::new(MemoryCatalog::new()),
//! );
//! let scanner = LibraryScanner::new(importer);
//!
//! let result = scanner.scan_directory(Path::new("/home/me/Downloads"), &no_progress).await?;
//! println!("{} imported, {} need metadata", result.succeeded, result.needs_enrichment.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod error;

pub mod config;
pub mod duplicates;
pub mod importer;
pub mod library_scanner;
pub mod metadata;
pub mod path_planner;
pub mod scanner;
pub mod transfer;

pub use config::{ImportConfig, PipelineConfig};
pub use duplicates::{ConflictResolution, DuplicateBasis, DuplicateCheck, DuplicateDetector};
pub use error::ImportError;
pub use importer::{ImportOutcome, LibraryImporter};
pub use library_scanner::{
    no_progress, FileConflict, LibraryScanner, ProgressSink, ReorganizeItem, ScanProgress,
    ScanResult,
};
pub use metadata::{LoftyTagReader, LoftyTagWriter};
pub use path_planner::PathPlanner;
pub use scanner::FileScanner;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, ImportError>;
