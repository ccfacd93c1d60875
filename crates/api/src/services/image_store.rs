//! Local storage for uploaded event images.
//!
//! Files land in `<public_dir>/events/<uuid>.<ext>` and the relative path
//! (`events/<uuid>.<ext>`) is what gets stored on the event.

use axum::body::Bytes;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Subdirectory for event images.
pub const EVENT_IMAGE_DIR: &str = "events";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("The image must be a file of type: jpeg, png, gif, bmp, svg, webp.")]
    NotAnImage,

    #[error("The image must not be greater than {max_kb} kilobytes.")]
    TooLarge { max_kb: u64 },

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// An image file received with an event form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// File extension for an accepted image content type.
fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/svg+xml" => Some("svg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_kb: u64,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.public_dir),
            max_kb: config.max_image_kb,
            max_bytes: config.max_image_bytes(),
        }
    }

    /// Checks type and size, returning the extension to store under.
    pub fn check(&self, upload: &ImageUpload) -> Result<&'static str, ImageError> {
        let extension = upload
            .content_type
            .as_deref()
            .and_then(image_extension)
            .ok_or(ImageError::NotAnImage)?;

        if upload.data.is_empty() {
            return Err(ImageError::NotAnImage);
        }

        if upload.data.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                max_kb: self.max_kb,
            });
        }

        Ok(extension)
    }

    /// Writes the upload under a fresh name and returns its relative path.
    pub async fn store(&self, upload: &ImageUpload) -> Result<String, ImageError> {
        let extension = self.check(upload)?;
        let relative = format!("{}/{}.{}", EVENT_IMAGE_DIR, Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(self.root.join(EVENT_IMAGE_DIR)).await?;
        tokio::fs::write(self.root.join(&relative), &upload.data).await?;

        info!(
            path = %relative,
            bytes = upload.data.len(),
            original_name = upload.file_name.as_deref().unwrap_or(""),
            "Stored event image"
        );

        Ok(relative)
    }
}
