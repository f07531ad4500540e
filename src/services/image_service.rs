use anyhow::{Context, anyhow};
use image::{ColorType, DynamicImage, GenericImageView};
use rand::{Rng, thread_rng};
use std::path::PathBuf;

use crate::domain::forms::{FormErrors, Upload};
use crate::error::AppError;

pub const MAX_IMAGE_DIMENSION: u32 = 1200;

/// Stores post pictures on disk under random names, shrunk to fit a square
/// of [`MAX_IMAGE_DIMENSION`] pixels.
#[derive(Debug, Clone)]
pub struct ImageStore {
    upload_dir: PathBuf,
    max_dimension: u32,
}

impl ImageStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_dimension: MAX_IMAGE_DIMENSION,
        }
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.upload_dir.join(filename)
    }

    /// Decode, shrink and write the upload. Returns the stored filename.
    pub async fn save_picture(&self, upload: &Upload) -> Result<String, AppError> {
        let extension = upload.extension().unwrap_or_else(|| "png".to_string());
        let filename = format!("{}.{}", random_hex(8), extension);
        let path = self.path_of(&filename);
        let upload_dir = self.upload_dir.clone();
        let max_dimension = self.max_dimension;
        let bytes = upload.bytes.clone();

        let decoded = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<()>> {
            let img = match image::load_from_memory(&bytes) {
                Ok(img) => img,
                Err(_) => return Ok(None),
            };
            let img = encodable_as(shrink_to_fit(img, max_dimension), &extension);

            std::fs::create_dir_all(&upload_dir)
                .with_context(|| format!("creating {}", upload_dir.display()))?;
            img.save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            Ok(Some(()))
        })
        .await
        .map_err(|e| anyhow!("image task failed: {}", e))??;

        match decoded {
            Some(()) => {
                tracing::info!(filename = %filename, "Stored uploaded picture");
                Ok(filename)
            }
            None => Err(AppError::Validation(FormErrors::single(
                "image_upload",
                "The file is not a readable image.",
            ))),
        }
    }

    /// Delete a stored picture. Web URLs and unknown names are ignored.
    pub async fn remove_picture(&self, image: &str) {
        if image.starts_with("http") || !is_plain_filename(image) {
            return;
        }

        let path = self.path_of(image);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed picture"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), "Failed to remove picture: {}", e),
        }
    }
}

fn shrink_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width > max_dimension || height > max_dimension {
        img.thumbnail(max_dimension, max_dimension)
    } else {
        img
    }
}

/// Convert to a pixel layout the encoder for `extension` accepts.
fn encodable_as(img: DynamicImage, extension: &str) -> DynamicImage {
    match extension {
        "jpg" | "jpeg" if img.color() != ColorType::Rgb8 => DynamicImage::ImageRgb8(img.to_rgb8()),
        "gif" if img.color() != ColorType::Rgba8 => DynamicImage::ImageRgba8(img.to_rgba8()),
        "png" if matches!(img.color(), ColorType::Rgb32F | ColorType::Rgba32F) => {
            DynamicImage::ImageRgba8(img.to_rgba8())
        }
        _ => img,
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    thread_rng().fill(bytes.as_mut_slice());
    hex::encode(bytes)
}
