//! QR code generation for attendee verification links.
//!
//! Each successful registration gets a PNG whose content is the attendee's
//! `/verify/{emp_id}` URL. Files are named with a random UUID so repeated
//! registrations never overwrite each other.

use std::path::PathBuf;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use summit_core::AttendeeId;

/// Smallest edge length of a generated image, in pixels.
const MIN_DIMENSION: u32 = 300;

/// Errors that can occur while producing a QR code image.
#[derive(Debug, Error)]
pub enum QrError {
    /// The base URL cannot have path segments appended.
    #[error("cannot build verification URL from base {0}")]
    InvalidBaseUrl(String),

    /// The payload does not fit in a QR code.
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// PNG encoding or writing failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Creating the output directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking encoder task panicked or was cancelled.
    #[error("encoder task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A QR code image written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// File name inside the QR directory (`<uuid>.png`).
    pub file_name: String,
    /// Full path of the written file.
    pub path: PathBuf,
}

/// Writes verification QR codes into a directory.
#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    dir: PathBuf,
}

impl QrCodeGenerator {
    /// Create a generator writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Encode `payload` and write it as a PNG with a fresh random name.
    ///
    /// Encoding runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `QrError` if encoding fails or the file cannot be written.
    pub async fn generate(&self, payload: &str) -> Result<GeneratedCode, QrError> {
        let file_name = format!("{}.png", Uuid::new_v4());
        let path = self.dir.join(&file_name);
        let dir = self.dir.clone();
        let payload = payload.to_owned();
        let target = path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), QrError> {
            std::fs::create_dir_all(&dir)?;
            render(&payload)?.save_with_format(&target, ImageFormat::Png)?;
            Ok(())
        })
        .await??;

        tracing::debug!(file = %file_name, "QR code written");
        Ok(GeneratedCode { file_name, path })
    }

    /// Delete a previously generated image, logging instead of failing.
    pub async fn discard(&self, code: &GeneratedCode) {
        if let Err(e) = tokio::fs::remove_file(&code.path).await {
            tracing::warn!(file = %code.file_name, error = %e, "Failed to remove orphaned QR code");
        }
    }
}

/// Render `payload` to a grayscale image.
///
/// Output is deterministic for a given payload.
fn render(payload: &str) -> Result<image::ImageBuffer<Luma<u8>, Vec<u8>>, QrError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
    Ok(code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .build())
}

/// Build `<base>/verify/<emp_id>`, percent-encoding the identifier.
///
/// # Errors
///
/// Returns `QrError::InvalidBaseUrl` if `base` cannot carry a path.
pub fn verification_url(base: &Url, emp_id: &AttendeeId) -> Result<Url, QrError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| QrError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .push("verify")
        .push(emp_id.as_str());
    Ok(url)
}
