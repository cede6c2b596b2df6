//! Thumbnail upload checks and storage

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::FileUpload;

/// Largest accepted thumbnail: 4 MiB
pub const MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/jpg", "image/webp"];

/// Reject anything that is not a small image
pub fn check_upload(file: &FileUpload) -> ProductResult<()> {
    if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
        return Err(ProductError::InvalidUpload(format!(
            "File must be an image ({}), got '{}'",
            ALLOWED_IMAGE_TYPES.join(", "),
            file.content_type
        )));
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(ProductError::InvalidUpload(
            "File must be smaller than 4MB".to_string(),
        ));
    }
    Ok(())
}

/// Persists thumbnails and hands back the public path they are served from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    async fn store(&self, file: FileUpload) -> ProductResult<String>;

    /// Best-effort removal of a previously stored thumbnail
    async fn remove(&self, public_path: &str) -> ProductResult<()>;
}

/// Writes thumbnails into a local directory served as static files
pub struct LocalThumbnailStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalThumbnailStore {
    /// `public_prefix` is the URL path the `root` directory is mounted at
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn file_name_of<'a>(&self, public_path: &'a str) -> Option<&'a str> {
        public_path
            .strip_prefix(&self.public_prefix)?
            .strip_prefix('/')
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
    }
}

/// Keep ASCII alphanumerics, dots, dashes and underscores
fn sanitize(file_name: &str) -> String {
    let cleaned: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
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

#[async_trait]
impl ThumbnailStore for LocalThumbnailStore {
    async fn store(&self, file: FileUpload) -> ProductResult<String> {
        let name = format!("{}-{}", Uuid::now_v7(), sanitize(&file.file_name));
        let path = self.root.join(&name);

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ProductError::Storage(e.to_string()))?;

        let mut out = fs::File::create(&path)
            .await
            .map_err(|e| ProductError::Storage(e.to_string()))?;
        out.write_all(&file.bytes)
            .await
            .map_err(|e| ProductError::Storage(e.to_string()))?;
        out.sync_all()
            .await
            .map_err(|e| ProductError::Storage(e.to_string()))?;

        tracing::debug!(path = %path.display(), bytes = file.size(), "Stored thumbnail");
        Ok(format!("{}/{}", self.public_prefix, name))
    }

    async fn remove(&self, public_path: &str) -> ProductResult<()> {
        let Some(name) = self.file_name_of(public_path) else {
            return Ok(());
        };

        match fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProductError::Storage(e.to_string())),
        }
    }
}
