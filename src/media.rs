/// Image attachment storage on the local filesystem
///
/// Files live under `<root>/posts/` and are referenced from posts by their
/// path relative to the root.
use image::ImageFormat;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::MediaConfig;
use crate::error::{AppError, Result};

pub const UPLOAD_DIR: &str = "posts";

/// Longest stored path, `posts/<name>`, in bytes.
const MAX_STORED_PATH: usize = 255;
const SUFFIX_LEN: usize = 7;
const MAX_SAVE_ATTEMPTS: usize = 16;

/// Recognised image type of an uploaded file, if any.
pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    match image::guess_format(bytes).ok()? {
        format @ (ImageFormat::Gif
        | ImageFormat::Png
        | ImageFormat::Jpeg
        | ImageFormat::WebP
        | ImageFormat::Bmp) => Some(format),
        _ => None,
    }
}

/// Format of an upload that fully decodes as a supported image.
///
/// A matching signature alone is not enough: truncated or corrupted
/// payloads are rejected here.
pub fn verify_image(bytes: &[u8]) -> Option<ImageFormat> {
    let format = detect_image_format(bytes)?;
    match image::load_from_memory_with_format(bytes, format) {
        Ok(_) => Some(format),
        Err(e) => {
            tracing::debug!(?format, error = %e, "upload does not decode");
            None
        }
    }
}

fn mime_type(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Gif) => "image/gif",
        Some(ImageFormat::Png) => "image/png",
        Some(ImageFormat::Jpeg) => "image/jpeg",
        Some(ImageFormat::WebP) => "image/webp",
        Some(ImageFormat::Bmp) => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Basename of a client-supplied filename reduced to `[A-Za-z0-9._-]`.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(&['/', '\\'][..]).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Shorten `name` to at most `max` bytes, keeping its extension.
/// Expects a sanitized (ASCII) name.
fn truncate_name(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 2 <= max => {
            let keep = max - ext.len() - 1;
            format!("{}.{}", &stem[..keep], ext)
        }
        _ => name[..max].to_string(),
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            url: config.url.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Public URL of a stored file
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}{}", self.url, relative)
    }

    /// Store the bytes and return the path relative to the media root.
    /// An existing file of the same name is never overwritten.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(UPLOAD_DIR);
        fs::create_dir_all(&dir).await?;

        // Leave room for `_<suffix>` so a renamed copy still fits.
        let max_name = MAX_STORED_PATH - UPLOAD_DIR.len() - 1 - SUFFIX_LEN - 1;
        let base = truncate_name(&sanitize_filename(filename), max_name);

        let mut name = base.clone();
        let mut attempts = 0;
        let mut file = loop {
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&name))
                .await;
            match opened {
                Ok(file) => break file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if attempts >= MAX_SAVE_ATTEMPTS {
                        return Err(AppError::Internal(format!(
                            "no free name for upload '{}'",
                            base
                        )));
                    }
                    name = with_suffix(&base, &random_suffix());
                }
                Err(err) => return Err(err.into()),
            }
        };

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(err) = written {
            drop(file);
            let _ = fs::remove_file(dir.join(&name)).await;
            return Err(err.into());
        }

        let relative = format!("{}/{}", UPLOAD_DIR, name);
        tracing::debug!(path = %relative, size = bytes.len(), "media stored");
        Ok(relative)
    }

    /// Read a stored file; returns its bytes and content type.
    pub async fn open(&self, relative: &str) -> Result<(Vec<u8>, &'static str)> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe || relative.is_empty() {
            return Err(AppError::NotFound(format!("media '{}'", relative)));
        }

        let bytes = match fs::read(self.root.join(path)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!("media '{}'", relative)))
            }
            Err(err) => return Err(err.into()),
        };
        let content_type = mime_type(detect_image_format(&bytes));
        Ok((bytes, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
    ];

    fn storage(root: &Path) -> MediaStorage {
        MediaStorage::new(&MediaConfig {
            root: root.to_string_lossy().into_owned(),
            url: "/media/".into(),
            max_upload_bytes: 1024,
        })
    }

    #[test]
    fn recognises_gif_and_rejects_text() {
        assert_eq!(detect_image_format(SMALL_GIF), Some(ImageFormat::Gif));
        assert_eq!(detect_image_format(b"definitely not an image"), None);
    }

    #[test]
    fn corrupted_gif_does_not_verify() {
        assert_eq!(verify_image(SMALL_GIF), Some(ImageFormat::Gif));

        let corrupted = b"GIF89a this is not really an image at all";
        assert_eq!(detect_image_format(corrupted), Some(ImageFormat::Gif));
        assert_eq!(verify_image(corrupted), None);
        assert_eq!(verify_image(&SMALL_GIF[..20]), None);
    }

    #[test]
    fn truncate_keeps_extension() {
        assert_eq!(truncate_name("short.gif", 20), "short.gif");
        assert_eq!(truncate_name("abcdefghij.gif", 8), "abcd.gif");
        assert_eq!(truncate_name("abcdefghij", 4), "abcd");
    }

    #[test]
    fn sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\pics\\my cat.gif"), "my_cat.gif");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[tokio::test]
    async fn save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());

        let first = media.save("small.gif", SMALL_GIF).await.unwrap();
        let second = media.save("small.gif", SMALL_GIF).await.unwrap();
        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_") && second.ends_with(".gif"));

        let (bytes, content_type) = media.open(&second).await.unwrap();
        assert_eq!(bytes, SMALL_GIF);
        assert_eq!(content_type, "image/gif");
        assert_eq!(media.url_for(&first), "/media/posts/small.gif");
    }

    #[tokio::test]
    async fn long_filename_is_shortened() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        let long = format!("{}.gif", "a".repeat(300));

        let first = media.save(&long, SMALL_GIF).await.unwrap();
        let second = media.save(&long, SMALL_GIF).await.unwrap();
        for stored in [&first, &second] {
            assert!(stored.len() <= MAX_STORED_PATH, "{}", stored.len());
            assert!(stored.starts_with("posts/aaa") && stored.ends_with(".gif"));
            assert_eq!(media.open(stored).await.unwrap().0, SMALL_GIF);
        }
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn concurrent_saves_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        let payloads: Vec<Vec<u8>> = (0u8..8).map(|i| vec![i; 16]).collect();

        let saved = futures::future::join_all(
            payloads.iter().map(|bytes| media.save("same.gif", bytes)),
        )
        .await;

        let mut paths = std::collections::HashSet::new();
        for (result, bytes) in saved.into_iter().zip(&payloads) {
            let path = result.unwrap();
            assert_eq!(&media.open(&path).await.unwrap().0, bytes);
            assert!(paths.insert(path));
        }
        assert_eq!(paths.len(), payloads.len());
    }

    #[tokio::test]
    async fn open_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        assert!(matches!(
            media.open("../secret").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            media.open("posts/missing.gif").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
