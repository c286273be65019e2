// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Transient storage for uploaded images.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use uuid::Uuid;

use crate::error::Result;

/// Extension used when the client sends no usable file name.
const DEFAULT_EXTENSION: &str = "jpg";

/// An uploaded image written to disk, removed again on drop.
#[derive(Debug)]
pub struct UploadedImage {
    path: PathBuf,
}

impl UploadedImage {
    /// Write `bytes` to `<dir>/<uuid>.<ext>`, taking `ext` from the client file name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub async fn save(dir: &Path, client_name: Option<&str>, bytes: &[u8]) -> Result<Self> {
        let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension_of(client_name)));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved upload");
        Ok(Self { path })
    }

    /// Location of the stored file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UploadedImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove upload");
        }
    }
}

/// Decode an image file, sniffing the format from its contents.
///
/// # Errors
///
/// Returns [`crate::MeasureError::InvalidImage`] if the bytes are not a
/// supported image.
pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image)
}

/// Lowercased alphanumeric extension of a client file name, or `jpg`.
fn extension_of(client_name: Option<&str>) -> String {
    client_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), str::to_ascii_lowercase)
}
