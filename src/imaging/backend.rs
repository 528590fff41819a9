//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the transcoder
//! needs: identify, resize (to an AVIF derivative), and preview (tiny
//! in-memory encode for the blur placeholder).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Formats it cannot
//! decode surface as [`BackendError::Decode`], which the transcoder answers
//! by rendering a still frame through ffmpeg and retrying.

use super::params::{PreviewParams, ResizeParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot decode {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

impl BackendError {
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Result of an identify or resize operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Execute a resize operation, returning the dimensions written.
    fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError>;

    /// Encode a preview and return its bytes (JPEG).
    fn preview(&self, params: &PreviewParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::fit_within;
    use std::sync::Mutex;

    /// Mock backend that records operations and writes placeholder outputs.
    ///
    /// Every source is treated as `source_dims` large. Sources whose
    /// extension appears in `undecodable` fail with [`BackendError::Decode`].
    pub struct MockBackend {
        pub source_dims: Dimensions,
        pub undecodable: Vec<String>,
        pub fail_previews: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Resize {
            source: String,
            output: String,
            max_width: u32,
            max_height: u32,
            quality: u32,
        },
        Preview {
            source: String,
            quality: u32,
        },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                source_dims: Dimensions {
                    width: 2400,
                    height: 3600,
                },
                undecodable: vec!["heic".to_string(), "heif".to_string(), "avif".to_string()],
                fail_previews: false,
                operations: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                source_dims: Dimensions { width, height },
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn resize_sources(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Resize { source, .. } => Some(source),
                    _ => None,
                })
                .collect()
        }

        fn check_decodable(&self, path: &Path) -> Result<(), BackendError> {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            if self.undecodable.contains(&ext) {
                return Err(BackendError::Decode(path.display().to_string()));
            }
            Ok(())
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            Ok(self.source_dims)
        }

        fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                max_width: params.max_width,
                max_height: params.max_height,
                quality: params.quality.value(),
            });
            self.check_decodable(&params.source)?;
            std::fs::write(&params.output, b"mock avif")?;
            let dims = (self.source_dims.width, self.source_dims.height);
            Ok(fit_within(dims, (params.max_width, params.max_height)).into())
        }

        fn preview(&self, params: &PreviewParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Preview {
                source: params.source.to_string_lossy().to_string(),
                quality: params.quality.value(),
            });
            if self.fail_previews {
                return Err(BackendError::ProcessingFailed("mock preview".into()));
            }
            self.check_decodable(&params.source)?;
            Ok(vec![0xFF, 0xD8, 0xFF])
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(800, 600);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result, Dimensions { width: 800, height: 600 });

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_resize_fits_box_and_writes_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out.avif");
        let backend = MockBackend::new();

        let dims = backend
            .resize(&ResizeParams {
                source: "/source.jpg".into(),
                output: output.clone(),
                max_width: 1200,
                max_height: 1800,
                quality: super::super::params::Quality::new(80),
            })
            .unwrap();

        assert_eq!(dims, Dimensions { width: 1200, height: 1800 });
        assert!(output.exists());
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Resize { quality: 80, .. }
        ));
    }

    #[test]
    fn mock_rejects_undecodable_sources() {
        let backend = MockBackend::new();
        let err = backend
            .resize(&ResizeParams {
                source: "/IMG_1.HEIC".into(),
                output: "/never.avif".into(),
                max_width: 10,
                max_height: 10,
                quality: super::super::params::Quality::default(),
            })
            .unwrap_err();
        assert!(err.is_decode());
    }
}
