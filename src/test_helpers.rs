//! Shared test utilities for the gallery-ingest test suite.
//!
//! Fixture writers for input directories, a synthetic JPEG generator the
//! real backend can decode, and manifest lookups that panic with the list
//! of what *is* there when the thing you asked for isn't.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! write_files(tmp.path(), &["Bride_Aish_1.jpg", "IMG_0007.jpg"]);
//! let report = pipeline.build(true).unwrap();
//!
//! assert_eq!(group_names(&report.manifest), vec!["Aish", "Collection 1"]);
//! let aish = find_group(&report.manifest, "Aish");
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::Path;

use crate::manifest::{GalleryGroup, GalleryItem, Manifest};
use crate::scan::RawFile;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create each named file in `dir` with placeholder content.
pub fn write_files(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for name in names {
        std::fs::write(dir.join(name), format!("raw {name}")).unwrap();
    }
}

/// Build [`RawFile`]s for names without touching the filesystem.
/// Panics on a non-media name.
pub fn raw_files(names: &[&str]) -> Vec<RawFile> {
    names
        .iter()
        .map(|name| {
            RawFile::from_filename(name)
                .unwrap_or_else(|| panic!("'{name}' is not a media filename"))
        })
        .collect()
}

/// Write a small valid JPEG with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Manifest lookups (panic with a clear message on miss)
// =========================================================================

/// All group names in manifest order.
pub fn group_names(manifest: &Manifest) -> Vec<&str> {
    manifest.iter().map(|g| g.group.as_str()).collect()
}

/// Find a group by name. Panics if not found.
pub fn find_group<'a>(manifest: &'a Manifest, name: &str) -> &'a GalleryGroup {
    manifest.iter().find(|g| g.group == name).unwrap_or_else(|| {
        let names = group_names(manifest);
        panic!("group '{name}' not found. Available: {names:?}")
    })
}

/// Find an item by `src` anywhere in the manifest. Panics if not found.
pub fn find_item<'a>(manifest: &'a Manifest, src: &str) -> &'a GalleryItem {
    manifest
        .iter()
        .flat_map(|g| &g.items)
        .find(|i| i.src == src)
        .unwrap_or_else(|| {
            let srcs: Vec<&str> = manifest
                .iter()
                .flat_map(|g| &g.items)
                .map(|i| i.src.as_str())
                .collect();
            panic!("item '{src}' not found. Available: {srcs:?}")
        })
}
