//! Shared types used across the pipeline stages.
//!
//! [`MediaKind`] is the tagged union that drives dispatch everywhere a file
//! is handled differently depending on whether it is a still or a video:
//! scanning (is this media at all?), transcoding (which [`Transcoder`]
//! variant runs), derivative naming (which extension), and the manifest's
//! `type` field.
//!
//! [`Transcoder`]: crate::transcode::Transcoder

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw input extensions handled by the image pipeline.
///
/// HEIC/HEIF and AVIF have no decoder compiled in; they are accepted here
/// and reach the still-frame fallback during transcoding.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "tif", "tiff", "avif", "heic", "heif",
];

/// Raw input extensions handled by the video pipeline.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a bare extension (case-insensitive, no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Classify by MIME type (`image/*`, `video/*`), used for uploads that
    /// arrive without a usable filename.
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    /// Extension of the web derivative produced for this kind.
    pub fn derivative_extension(self) -> &'static str {
        match self {
            Self::Image => "avif",
            Self::Video => "mp4",
        }
    }

    /// Capitalized label used in generated alt/title text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Video => "Video",
        }
    }
}
