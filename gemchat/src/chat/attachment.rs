use std::path::{Path, PathBuf};

use anyhow::{Context as _, anyhow};
use url::Url;

use crate::error::ValidationError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];

/// An image picked for the next outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAttachment {
    path: PathBuf,
    size: u64,
    url: Url,
}

impl ImageAttachment {
    /// Checks the file type and size, failing with [`ValidationError`] when
    /// the file cannot be attached.
    pub async fn from_path(path: &Path, max_bytes: u64) -> Result<Self, anyhow::Error> {
        let extension = path
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ValidationError::UnsupportedImage(path.display().to_string()).into());
        }
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if metadata.len() > max_bytes {
            return Err(ValidationError::ImageTooLarge {
                limit_mb: max_bytes / (1024 * 1024),
            }
            .into());
        }
        let path = tokio::fs::canonicalize(path)
            .await
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let url = Url::from_file_path(&path)
            .map_err(|_| anyhow!("Cannot build file URL for {}", path.display()))?;
        tracing::debug!(%url, size = metadata.len(), "Image ready to send");
        Ok(Self {
            path,
            size: metadata.len(),
            url,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Percent-encoded `file://` URL stored as the message's image URL.
    pub fn url(&self) -> String {
        self.url.to_string()
    }
}
