//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Identify (AVIF) | `avif-parse` container metadata |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Preview | `DynamicImage::thumbnail` + `JpegEncoder` |
//!
//! The `image` crate's `"avif"` feature provides only the encoder, and
//! there is no HEIC decoder at all. Both come back as
//! [`BackendError::Decode`] so the caller can route them through ffmpeg.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{exceeds, fit_within};
use super::params::{PreviewParams, ResizeParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader};
use std::path::Path;

/// AV1 encoder speed (1 slowest … 10 fastest).
const AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_avif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

fn decode_error(path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(io) => BackendError::Io(io),
        other => BackendError::Decode(format!("{}: {other}", path.display())),
    }
}

/// Load, decode, and apply the EXIF orientation so pixels are upright.
fn load_oriented(path: &Path) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let mut decoder = reader.into_decoder().map_err(|e| decode_error(path, e))?;
    let orientation = decoder.orientation().map_err(|e| decode_error(path, e))?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Encode and save as AVIF.
fn save_avif(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
        writer,
        AVIF_SPEED,
        quality.clamp(1, 100) as u8,
    );
    // The encoder takes 8-bit layouts; normalize deeper sources first.
    let normalized = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    normalized
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("AVIF encode failed: {e}")))
}

/// Extract dimensions from an AVIF file's container metadata.
fn identify_avif(path: &Path) -> Result<Dimensions, BackendError> {
    let file_data = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&file_data))
        .map_err(|e| BackendError::Decode(format!("{}: {e:?}", path.display())))?;
    let meta = avif.primary_item_metadata().map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "Failed to read AVIF metadata {}: {e:?}",
            path.display()
        ))
    })?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if is_avif(path) {
            return identify_avif(path);
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| decode_error(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError> {
        let img = load_oriented(&params.source)?;
        let source = (img.width(), img.height());
        let bounds = (params.max_width, params.max_height);

        let out = if exceeds(source, bounds) {
            let (w, h) = fit_within(source, bounds);
            img.resize_exact(w, h, FilterType::Lanczos3)
        } else {
            img
        };

        save_avif(&out, &params.output, params.quality.value())?;
        Ok(Dimensions {
            width: out.width(),
            height: out.height(),
        })
    }

    fn preview(&self, params: &PreviewParams) -> Result<Vec<u8>, BackendError> {
        let img = load_oriented(&params.source)?;
        let (w, h) = fit_within(
            (img.width(), img.height()),
            (params.max_width, params.max_height),
        );
        let small = DynamicImage::ImageRgb8(img.thumbnail_exact(w, h).to_rgb8());

        let mut bytes = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut bytes,
            params.quality.value() as u8,
        );
        small
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::ProcessingFailed(format!("preview encode failed: {e}")))?;
        Ok(bytes)
    }
}
