//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions`, `avif-parse` for AVIF |
//! | **Resize → AVIF** | Lanczos3 + rav1e encoder, fit-within, no upscaling |
//! | **Preview** | tiny JPEG, wrapped as a base64 `data:` URI |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::fit_within;
pub use operations::{EncodeBox, blur_data_uri, encode_derivative};
pub use params::{PreviewParams, Quality, ResizeParams};
pub use rust_backend::RustBackend;
