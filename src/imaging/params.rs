//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how*. They sit between the
//! transcoder (which decides which derivatives to produce) and the
//! [`backend`](super::backend) (which does the pixel work), so tests can
//! swap in a mock backend without touching transcoding logic.
//!
//! - [`Quality`]: lossy encoding quality, clamped to 1–100.
//! - [`ResizeParams`]: fit-within resize of a source into an AVIF derivative.
//! - [`PreviewParams`]: tiny low-quality preview encoded in memory.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Resize `source` to fit inside `max_width` x `max_height` (never upscaling)
/// and encode to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}

/// Produce preview bytes for `source`, fitting the bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewParams {
    pub source: PathBuf,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }
}
