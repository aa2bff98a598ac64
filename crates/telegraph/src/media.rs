//! Media download and local storage
//!
//! Figure images and videos are copied into the upload directory under a
//! random name and referenced through the public route.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::MediaConfig;
use crate::fetch::{Fetched, Fetcher};
use crate::Result;

/// Failures persisting or locating a stored asset
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not an uploaded asset: {0}")]
    InvalidReference(String),
}

/// Media types with a known file extension
pub const MEDIA_EXTENSIONS: &[(&str, &str)] = &[
    ("audio/mp4", "m4a"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("image/bmp", "bmp"),
    ("image/gif", "gif"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/svg+xml", "svg"),
    ("image/tiff", "tiff"),
    ("video/3gpp", "3gp"),
    ("video/mp4", "mp4"),
    ("video/mpeg", "mpeg"),
    ("video/ogg", "ogv"),
    ("audio/midi", "midi"),
    ("audio/x-flac", "flac"),
    ("audio/x-ms-wma", "wma"),
    ("audio/x-wav", "wav"),
    ("video/x-matroska", "mkv"),
    ("video/x-ms-wmv", "wmv"),
    ("video/x-msvideo", "avi"),
];

const NAME_LEN: usize = 48;
const HEX: &[u8; 16] = b"0123456789abcdef";

static ASSET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{48}(\.[a-z0-9]{1,4})?$").unwrap());

/// Media type without parameters, lowercased
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Media type of a download.
///
/// Uses the `Content-Type` header when present, otherwise sniffs the
/// leading bytes of the body.
pub fn media_type_of(fetched: &Fetched) -> Option<String> {
    fetched
        .content_type
        .as_deref()
        .map(essence)
        .filter(|media_type| !media_type.is_empty())
        .or_else(|| infer::get(&fetched.body).map(|kind| kind.mime_type().to_string()))
}

/// File extension for a media type
pub fn extension_for(media_type: &str) -> Option<&'static str> {
    MEDIA_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == media_type)
        .map(|(_, ext)| *ext)
}

fn random_name(ext: Option<&str>) -> String {
    let mut rng = rand::rng();
    let mut name: String = (0..NAME_LEN)
        .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
        .collect();

    if let Some(ext) = ext {
        name.push('.');
        name.push_str(ext);
    }
    name
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Upload directory plus the route it is served under
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    route: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, route: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            route: route.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.upload_dir.clone(), config.route.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh name and return its public reference
    pub async fn save(
        &self,
        bytes: &[u8],
        media_type: Option<&str>,
    ) -> std::result::Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        let ext = media_type.and_then(extension_for);

        loop {
            let name = random_name(ext);
            let path = self.dir.join(&name);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(io_error(&path)(e)),
            };

            file.write_all(bytes).await.map_err(io_error(&path))?;
            file.flush().await.map_err(io_error(&path))?;

            tracing::debug!(path = %path.display(), ?media_type, "stored asset");
            return Ok(format!("{}/{}", self.route, name));
        }
    }

    /// Map a reference back to its file.
    ///
    /// Accepts `route/<name>`, `/<name>` or a path inside the upload
    /// directory.
    pub fn path_for(&self, reference: &str) -> std::result::Result<PathBuf, StorageError> {
        let route_prefix = format!("{}/", self.route);
        let name = if let Some(name) = reference.strip_prefix(&route_prefix) {
            name
        } else if let Some(name) = Path::new(reference)
            .strip_prefix(&self.dir)
            .ok()
            .and_then(|p| p.to_str())
        {
            name
        } else if let Some(name) = reference.strip_prefix('/') {
            name
        } else {
            reference
        };

        if !ASSET_NAME.is_match(name) {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        Ok(self.dir.join(name))
    }

    /// Delete a stored asset; `false` when it was already gone
    pub async fn remove(&self, reference: &str) -> std::result::Result<bool, StorageError> {
        let path = self.path_for(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}

/// Download capability: fetch a remote file and keep a local copy
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the local asset reference
    async fn download(&self, url: &str) -> Result<String>;

    /// Drop an asset returned by [`download`](Self::download) whose
    /// conversion failed. Nothing is kept by default.
    async fn discard(&self, _reference: &str) -> Result<()> {
        Ok(())
    }
}

/// [`Downloader`] that stores into an [`UploadStore`]
pub struct MediaDownloader {
    fetcher: Arc<dyn Fetcher>,
    store: UploadStore,
}

impl MediaDownloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: UploadStore) -> Self {
        Self { fetcher, store }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }
}

#[async_trait]
impl Downloader for MediaDownloader {
    #[tracing::instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<String> {
        let fetched = self.fetcher.fetch_bytes(url).await?;
        let media_type = media_type_of(&fetched);
        let reference = self
            .store
            .save(&fetched.body, media_type.as_deref())
            .await?;
        Ok(reference)
    }

    async fn discard(&self, reference: &str) -> Result<()> {
        if self.store.remove(reference).await? {
            tracing::debug!(reference, "discarded asset");
        }
        Ok(())
    }
}
