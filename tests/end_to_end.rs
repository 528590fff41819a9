//! Full build runs through the real image backend.
//!
//! Video work is faked: "compression" copies the bytes and frame grabs
//! write a synthetic JPEG, so these tests need no ffmpeg on the machine.

use gallery_ingest::config::GalleryConfig;
use gallery_ingest::ffmpeg::{CompressParams, ToolError, VideoTool};
use gallery_ingest::imaging::RustBackend;
use gallery_ingest::manifest::{self, GalleryGroup, Manifest};
use gallery_ingest::pipeline::Pipeline;
use gallery_ingest::types::MediaKind;
use image::{ImageEncoder, RgbImage};
use std::path::Path;
use tempfile::TempDir;

struct FakeFfmpeg;

impl VideoTool for FakeFfmpeg {
    fn compress(&self, params: &CompressParams) -> Result<(), ToolError> {
        std::fs::copy(&params.source, &params.output)?;
        Ok(())
    }

    fn extract_frame(&self, _video: &Path, _offset: &str, output: &Path) -> Result<(), ToolError> {
        write_jpeg(output, 160, 90);
        Ok(())
    }

    fn render_still(&self, _input: &Path, output: &Path) -> Result<(), ToolError> {
        write_jpeg(output, 40, 60);
        Ok(())
    }
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 90])
    });
    let file = std::fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

fn write_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, image::Rgb([200, 20, 20]))
        .save(path)
        .unwrap();
}

/// `{Bride_Aish_1.jpg, Bride_Aish_2.mp4, IMG_0007.jpg, Collection_1.png}`
fn setup(tmp: &TempDir) -> GalleryConfig {
    let input = tmp.path().join("public/gallery");
    std::fs::create_dir_all(&input).unwrap();
    write_jpeg(&input.join("Bride_Aish_1.jpg"), 60, 90);
    std::fs::write(input.join("Bride_Aish_2.mp4"), b"not really a video").unwrap();
    write_jpeg(&input.join("IMG_0007.jpg"), 80, 40);
    write_png(&input.join("Collection_1.png"), 30, 30);
    std::fs::write(input.join(".DS_Store"), b"junk").unwrap();

    let mut config = GalleryConfig::default();
    config.paths.input = input.to_string_lossy().into_owned();
    config.paths.manifest = tmp
        .path()
        .join("src/data/gallery-processed.json")
        .to_string_lossy()
        .into_owned();
    config
}

fn group<'a>(manifest: &'a Manifest, name: &str) -> &'a GalleryGroup {
    manifest
        .iter()
        .find(|g| g.group == name)
        .unwrap_or_else(|| panic!("group '{name}' missing"))
}

#[test]
fn builds_expected_manifest() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let backend = RustBackend::new();

    let report = Pipeline::new(&config, &backend, &FakeFfmpeg).build(true).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let names: Vec<&str> = report.manifest.iter().map(|g| g.group.as_str()).collect();
    assert_eq!(names, vec!["Aish", "Collection 1"]);

    let aish = group(&report.manifest, "Aish");
    assert_eq!(aish.items.len(), 2);

    let image = &aish.items[0];
    assert_eq!(image.kind, MediaKind::Image);
    assert_eq!(image.src, "/gallery/bride_aish_1.avif");
    assert_eq!((image.width, image.height), (60, 90));
    assert!(image.poster.is_none());
    assert!(
        image
            .blur_data
            .as_deref()
            .is_some_and(|d| d.starts_with("data:image/jpeg;base64,"))
    );
    assert_eq!(image.badge.as_deref(), Some("Real Bride"));

    let video = &aish.items[1];
    assert_eq!(video.kind, MediaKind::Video);
    assert_eq!(video.src, "/gallery/bride_aish_2.mp4");
    assert_eq!(
        video.poster.as_deref(),
        Some("/gallery/bride_aish_2_poster.avif")
    );
    assert_eq!((video.width, video.height), (160, 90));
    assert!(video.alt.ends_with(" - Video"));

    let collection = group(&report.manifest, "Collection 1");
    assert_eq!(collection.items.len(), 1);
    assert_eq!(collection.items[0].src, "/gallery/bride_collection_1.avif");
    // sourced from IMG_0007.jpg, not Collection_1.png
    assert_eq!((collection.items[0].width, collection.items[0].height), (80, 40));

    let out = config.output_dir();
    for file in [
        "bride_aish_1.avif",
        "bride_aish_2.mp4",
        "bride_aish_2_poster.avif",
        "bride_collection_1.avif",
    ] {
        assert!(out.join(file).is_file(), "{file} missing");
    }
    assert!(out.join("Bride_Aish_1.jpg").is_file(), "raw inputs are kept");

    let on_disk = manifest::load(&config.manifest_path()).unwrap();
    assert_eq!(on_disk, report.manifest);
}

#[test]
fn rebuild_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&config, &backend, &FakeFfmpeg);

    pipeline.build(true).unwrap();
    let first = std::fs::read(config.manifest_path()).unwrap();

    let cached = pipeline.build(true).unwrap();
    assert_eq!(cached.cache.misses, 0);
    assert_eq!(std::fs::read(config.manifest_path()).unwrap(), first);

    let fresh = pipeline.build(false).unwrap();
    assert_eq!(fresh.cache.hits, 0);
    assert_eq!(std::fs::read(config.manifest_path()).unwrap(), first);
}

#[test]
fn separate_output_directory() {
    let tmp = TempDir::new().unwrap();
    let mut config = setup(&tmp);
    let out = tmp.path().join("dist/gallery");
    config.paths.output = Some(out.to_string_lossy().into_owned());
    let backend = RustBackend::new();

    let report = Pipeline::new(&config, &backend, &FakeFfmpeg).build(true).unwrap();

    assert_eq!(report.item_count(), 3);
    assert!(out.join("bride_aish_1.avif").is_file());
    assert!(!config.input_dir().join("bride_aish_1.avif").exists());
}
