//! Optional dumps of every intermediate image produced while capturing.

use crate::error::{CaptureError, Result};
use crate::imaging::Image;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait DebugScreenshots: Send + Sync {
    async fn save(&self, image: &Image, label: &str) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDebugScreenshots;

#[async_trait]
impl DebugScreenshots for NullDebugScreenshots {
    async fn save(&self, _image: &Image, _label: &str) -> Result<()> {
        Ok(())
    }
}

/// Writes `<directory>/<prefix><timestamp>_<label>.png`.
#[derive(Debug, Clone)]
pub struct FileDebugScreenshots {
    directory: PathBuf,
    prefix: String,
}

impl FileDebugScreenshots {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_name(&self, label: &str) -> String {
        let timestamp = chrono::Utc::now().format("%Y_%m_%d_%H_%M_%S_%3f");
        format!("{}{}_{}.png", self.prefix, timestamp, label)
    }
}

#[async_trait]
impl DebugScreenshots for FileDebugScreenshots {
    async fn save(&self, image: &Image, label: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| {
                CaptureError::Other(format!(
                    "Failed to create debug screenshot directory {}: {}",
                    self.directory.display(),
                    e
                ))
            })?;

        let path = self.directory.join(self.file_name(label));
        tokio::fs::write(&path, image.to_png()?).await?;
        log::debug!("Saved debug screenshot {}", path.display());
        Ok(())
    }
}

/// Saves `image`, logging instead of failing: debug output never breaks a capture.
pub(crate) async fn save_quietly(debug: &dyn DebugScreenshots, image: &Image, label: &str) {
    if let Err(e) = debug.save(image, label).await {
        log::warn!("Failed to save debug screenshot '{}': {}", label, e);
    }
}
