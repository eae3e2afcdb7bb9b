//! Cover art discovery and embedding

use crate::config::EnrichmentConfig;
use crate::error::{EnrichmentError, Result};
use async_trait::async_trait;
use lofty::{Picture, PictureType, Probe, Tag, TagExt, TaggedFileExt};
use medley_core::CoverArtEmbedder;
use reqwest::Client;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Well-known cover file names, in order of preference
pub const COVER_FILENAMES: &[&str] = &[
    "cover.jpg",
    "Cover.jpg",
    "cover.jpeg",
    "Cover.jpeg",
    "cover.png",
    "Cover.png",
    "cover.gif",
    "Cover.gif",
    "folder.jpg",
    "Folder.jpg",
    "album.jpg",
    "Album.jpg",
    "albumart.jpg",
    "AlbumArt.jpg",
];

/// Image extensions accepted by the fallback search (lowercase)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Find the cover image for the album stored in `dir`
///
/// Prefers a well-known file name, then falls back to the lexically first
/// image in the directory. Unreadable directories yield `None`.
pub fn find_cover_art(dir: &Path) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Cannot read directory for cover art");
            return None;
        }
    };

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| is_image_file(path))
        .collect();

    for name in COVER_FILENAMES {
        if let Some(found) = images
            .iter()
            .find(|p| p.file_name().is_some_and(|f| f == *name))
        {
            return Some(found.clone());
        }
    }

    images.sort();
    images.into_iter().next()
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Downloads cover images and attaches them to audio files
///
/// The image is written next to the file (`cover.jpg`/`cover.png`) when the
/// folder has no cover yet, then embedded as the front cover of the file's
/// primary tag.
pub struct HttpCoverArtEmbedder {
    http: Client,
}

impl HttpCoverArtEmbedder {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http })
    }

    /// Use an existing HTTP client
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, &'static str)> {
        let response = self.http.get(url).send().await?.error_for_status()?;

        let extension = match response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            Some(mime) if mime.starts_with("image/png") => "png",
            _ => "jpg",
        };

        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), extension))
    }

    async fn fetch_and_embed(&self, path: &Path, url: &str) -> Result<()> {
        let (data, extension) = self.download(url).await?;
        tracing::debug!(url = %url, bytes = data.len(), "Downloaded cover art");

        if let Some(dir) = path.parent() {
            if find_cover_art(dir).is_none() {
                let cover_path = dir.join(format!("cover.{}", extension));
                tokio::fs::write(&cover_path, &data).await?;
                tracing::debug!(path = %cover_path.display(), "Saved folder cover");
            }
        }

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || embed_front_cover(&owned, &data))
            .await
            .map_err(|e| EnrichmentError::Tag(format!("Embedding task failed: {}", e)))?
    }
}

#[async_trait]
impl CoverArtEmbedder for HttpCoverArtEmbedder {
    async fn embed_from_url(&self, path: &Path, url: &str) -> bool {
        match self.fetch_and_embed(path, url).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Embedded cover art");
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), url = %url, error = %e, "Failed to embed cover art");
                false
            }
        }
    }
}

/// Replace the front cover in the file's primary tag
fn embed_front_cover(path: &Path, data: &[u8]) -> Result<()> {
    let tag_error = |e: lofty::error::LoftyError| EnrichmentError::Tag(e.to_string());

    let mut picture = Picture::from_reader(&mut Cursor::new(data)).map_err(tag_error)?;
    picture.set_pic_type(PictureType::CoverFront);

    let mut tagged_file = Probe::open(path).map_err(tag_error)?.read().map_err(tag_error)?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| EnrichmentError::Tag(format!("No writable tag in {}", path.display())))?;

    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(picture);
    tag.save_to_path(path).map_err(tag_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn prefers_well_known_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("aaa.png"), b"png").unwrap();
        fs::write(dir.path().join("folder.jpg"), b"jpg").unwrap();
        fs::write(dir.path().join("cover.png"), b"png").unwrap();

        // cover.png ranks above folder.jpg
        assert_eq!(find_cover_art(dir.path()), Some(dir.path().join("cover.png")));
    }

    #[test]
    fn falls_back_to_first_image_lexically() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("scan-back.JPG"), b"jpg").unwrap();
        fs::write(dir.path().join("booklet.webp"), b"webp").unwrap();
        fs::write(dir.path().join("01 - Track.flac"), b"audio").unwrap();

        assert_eq!(find_cover_art(dir.path()), Some(dir.path().join("booklet.webp")));
    }

    #[test]
    fn ignores_non_images_and_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("cover.jpg")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        assert_eq!(find_cover_art(dir.path()), None);
    }

    #[test]
    fn missing_directory_has_no_cover() {
        assert_eq!(find_cover_art(Path::new("/nonexistent/medley/album")), None);
    }
}
