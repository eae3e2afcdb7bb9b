//! Enumeration of audio files on disk

use crate::{ImportError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Audio file extensions recognized by default
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "wav", "wma", "aif", "aiff",
];

/// Recursive audio file finder
///
/// Results are sorted so that scans process files in a stable order on every
/// platform.
#[derive(Debug, Clone)]
pub struct FileScanner {
    follow_links: bool,
    max_depth: Option<usize>,
    extensions: Vec<String>,
}

impl Default for FileScanner {
    fn default() -> Self {
        Self {
            follow_links: false,
            max_depth: None,
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl FileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Replace the recognized extensions (compared case-insensitively)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// All audio files under `path`, sorted
    pub fn scan_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        if !path.is_dir() {
            return Err(ImportError::InvalidPath(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let mut walker = WalkDir::new(path).follow_links(self.follow_links);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut audio_files = Vec::new();
        for entry in walker.into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file() && self.is_audio_file(entry.path()) {
                audio_files.push(entry.into_path());
            }
        }

        audio_files.sort();
        tracing::debug!(root = %path.display(), count = audio_files.len(), "Found audio files");

        Ok(audio_files)
    }

    /// Whether `path` has one of the recognized extensions
    pub fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}
