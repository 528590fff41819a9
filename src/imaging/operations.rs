//! High-level image operations.
//!
//! These functions combine calculations with backend execution.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{PreviewParams, Quality, ResizeParams};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// MIME type of the preview bytes produced by every backend.
pub const PREVIEW_MIME: &str = "image/jpeg";

/// Bounding box and quality for one kind of encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeBox {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}

/// Encode `source` into an AVIF derivative at `output`.
pub fn encode_derivative(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &EncodeBox,
) -> Result<Dimensions> {
    backend.resize(&ResizeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        max_width: config.max_width,
        max_height: config.max_height,
        quality: config.quality,
    })
}

/// Wrap raw preview bytes as a `data:` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Build the blur placeholder for `source`.
pub fn blur_data_uri(
    backend: &impl ImageBackend,
    source: &Path,
    config: &EncodeBox,
) -> Result<String> {
    let bytes = backend.preview(&PreviewParams {
        source: source.to_path_buf(),
        max_width: config.max_width,
        max_height: config.max_height,
        quality: config.quality,
    })?;
    Ok(data_uri(PREVIEW_MIME, &bytes))
}
