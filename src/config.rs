//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `gallery.toml`. Stock defaults
//! are serialized to a TOML value, the user file is merged on top of it
//! key by key, and the result is deserialized and validated. Command-line
//! path flags are applied last.
//!
//! ```text
//! stock defaults ──merge── gallery.toml ──deserialize── validate ── CLI overrides
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! input = "public/gallery"                   # Raw media directory
//! # output = "public/gallery"                # Derivatives (default: input)
//! manifest = "src/data/gallery-processed.json"
//! public_prefix = "/gallery"                 # URL prefix for src/poster
//!
//! [images]
//! max_width = 1200
//! max_height = 1800
//! quality = 80
//!
//! [video]
//! max_height = 720
//! crf = 28
//! preset = "fast"
//! audio_bitrate = "128k"
//! poster_offset = "00:00:01"
//! poster_max_width = 720
//! poster_max_height = 1280
//! poster_quality = 80
//!
//! [preview]
//! max_width = 10
//! max_height = 10
//! quality = 20
//!
//! [tools]
//! ffmpeg = "ffmpeg"
//! timeout_secs = 600
//!
//! [metadata]
//! site_name = "Kaya Planet"
//! brand_tag = "kayaplanetbride"
//! # ... see `gen-config` for the full pools
//!
//! [[metadata.badges]]
//! token = "Aish"
//! label = "Real Bride"
//! type = "real-bride"
//!
//! [server]
//! bind = "127.0.0.1:3000"
//! max_upload_mb = 256
//! ```
//!
//! Unknown keys are rejected to catch typos early. Arrays (the hashtag and
//! phrase pools, the badge table) replace the stock value as a whole.

use crate::imaging::{EncodeBox, Quality};
use crate::transcode::{TranscodeSettings, VideoSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file read when `--config` is not given. Its absence is not an error.
pub const DEFAULT_CONFIG_FILE: &str = "gallery.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    pub paths: PathsConfig,
    pub images: ImagesConfig,
    pub video: VideoConfig,
    pub preview: PreviewConfig,
    pub tools: ToolsConfig,
    pub metadata: MetadataConfig,
    pub server: ServerConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let qualities = [
            ("images.quality", self.images.quality),
            ("video.poster_quality", self.video.poster_quality),
            ("preview.quality", self.preview.quality),
        ];
        for (key, q) in qualities {
            if !(1..=100).contains(&q) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }

        let boxes = [
            ("images", self.images.max_width, self.images.max_height),
            ("video.poster", self.video.poster_max_width, self.video.poster_max_height),
            ("preview", self.preview.max_width, self.preview.max_height),
        ];
        for (key, w, h) in boxes {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(format!(
                    "{key} bounding box must be non-zero"
                )));
            }
        }

        if self.video.max_height == 0 {
            return Err(ConfigError::Validation(
                "video.max_height must be non-zero".into(),
            ));
        }
        if self.video.crf > 51 {
            return Err(ConfigError::Validation("video.crf must be 0-51".into()));
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tools.timeout_secs must be non-zero".into(),
            ));
        }
        if self.metadata.phrases.is_empty() {
            return Err(ConfigError::Validation(
                "metadata.phrases must not be empty".into(),
            ));
        }
        if self.paths.input.trim().is_empty() {
            return Err(ConfigError::Validation("paths.input must not be empty".into()));
        }
        if !self.paths.public_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "paths.public_prefix must start with '/'".into(),
            ));
        }
        if !(1..=MAX_UPLOAD_MB).contains(&self.server.max_upload_mb) {
            return Err(ConfigError::Validation(format!(
                "server.max_upload_mb must be 1-{MAX_UPLOAD_MB}"
            )));
        }
        Ok(())
    }

    pub fn input_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.input)
    }

    /// Derivative directory; the input directory unless configured.
    pub fn output_dir(&self) -> PathBuf {
        self.paths
            .output
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.input_dir())
    }

    pub fn manifest_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.manifest)
    }

    /// Public URL prefix without a trailing slash.
    pub fn public_prefix(&self) -> &str {
        self.paths.public_prefix.trim_end_matches('/')
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.timeout_secs)
    }

    pub fn transcode_settings(&self) -> TranscodeSettings {
        TranscodeSettings {
            image: EncodeBox {
                max_width: self.images.max_width,
                max_height: self.images.max_height,
                quality: Quality::new(self.images.quality),
            },
            poster: EncodeBox {
                max_width: self.video.poster_max_width,
                max_height: self.video.poster_max_height,
                quality: Quality::new(self.video.poster_quality),
            },
            preview: EncodeBox {
                max_width: self.preview.max_width,
                max_height: self.preview.max_height,
                quality: Quality::new(self.preview.quality),
            },
            video: VideoSettings {
                max_height: self.video.max_height,
                crf: self.video.crf,
                preset: self.video.preset.clone(),
                audio_bitrate: self.video.audio_bitrate.clone(),
                poster_offset: self.video.poster_offset.clone(),
            },
        }
    }

    /// Apply command-line path flags on top of the file configuration.
    pub fn apply_overrides(&mut self, overrides: &PathOverrides) {
        if let Some(input) = &overrides.input {
            self.paths.input = input.to_string_lossy().into_owned();
        }
        if let Some(output) = &overrides.output {
            self.paths.output = Some(output.to_string_lossy().into_owned());
        }
        if let Some(manifest) = &overrides.manifest {
            self.paths.manifest = manifest.to_string_lossy().into_owned();
        }
    }
}

/// Path flags given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Raw media directory.
    pub input: String,
    /// Derivative directory. `None` writes next to the raw files.
    pub output: Option<String>,
    /// Manifest JSON file.
    pub manifest: String,
    /// URL prefix under which the output directory is served.
    pub public_prefix: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: "public/gallery".into(),
            output: None,
            manifest: "src/data/gallery-processed.json".into(),
            public_prefix: "/gallery".into(),
        }
    }
}

/// Still-image derivative settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// AVIF encoding quality (1-100).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 1200,
            max_height: 1800,
            quality: 80,
        }
    }
}

/// Video derivative and poster settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    /// Height ceiling; shorter videos keep their height.
    pub max_height: u32,
    /// x264 constant rate factor (0-51, lower is better).
    pub crf: u32,
    pub preset: String,
    pub audio_bitrate: String,
    /// Poster frame position, `HH:MM:SS`.
    pub poster_offset: String,
    pub poster_max_width: u32,
    pub poster_max_height: u32,
    pub poster_quality: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_height: 720,
            crf: 28,
            preset: "fast".into(),
            audio_bitrate: "128k".into(),
            poster_offset: "00:00:01".into(),
            poster_max_width: 720,
            poster_max_height: 1280,
            poster_quality: 80,
        }
    }
}

/// Inline preview settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_width: 10,
            max_height: 10,
            quality: 20,
        }
    }
}

/// External tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// ffmpeg executable name or path.
    pub ffmpeg: String,
    /// Wall-clock limit per ffmpeg invocation.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            timeout_secs: 600,
        }
    }
}

/// Pools and tables for generated alt text, hashtags, and badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    pub site_name: String,
    /// Appended to every item's hashtags.
    pub brand_tag: String,
    /// Prefix of the per-subject hashtag (`bride` + `aish`).
    pub subject_tag_prefix: String,
    /// How many pool hashtags lead each item's list.
    pub hashtag_count: usize,
    pub hashtags: Vec<String>,
    /// Alt-text phrases, rotated by slot and subject length.
    pub phrases: Vec<String>,
    /// Hashtags for uploads, after the brand tag.
    pub upload_hashtags: Vec<String>,
    /// Ordered; the first token found in the subject name wins.
    pub badges: Vec<BadgeRule>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            site_name: "Kaya Planet".into(),
            brand_tag: "kayaplanetbride".into(),
            subject_tag_prefix: "bride".into(),
            hashtag_count: 4,
            hashtags: strings(&[
                "bestbridalmakeupkanpur",
                "makeupartistinkanpur",
                "bridalmakeup",
                "indianbride",
                "weddingmakeup",
                "kanpurmakeupartist",
                "softglam",
                "engagementmakeup",
                "hdmakeupkanpur",
            ]),
            phrases: strings(&[
                "Best Bridal Makeup in Kanpur",
                "Soft Engagement Look Kanpur",
                "Professional Bridal Makeover",
                "Luxury Wedding Makeup Artist",
                "Top Rated Makeup Academy Kanpur",
            ]),
            upload_hashtags: strings(&["bridalmakeup"]),
            badges: vec![
                BadgeRule::new("Aish", "Real Bride", "real-bride"),
                BadgeRule::new("Raadhya", "Signature", "signature"),
            ],
        }
    }
}

/// One row of the badge table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BadgeRule {
    /// Matched case-insensitively as a substring of the subject name.
    pub token: String,
    pub label: String,
    #[serde(rename = "type")]
    pub badge_type: String,
}

impl BadgeRule {
    pub fn new(token: &str, label: &str, badge_type: &str) -> Self {
        Self {
            token: token.into(),
            label: label.into(),
            badge_type: badge_type.into(),
        }
    }
}

/// Upper bound for `server.max_upload_mb`; the byte limit fits a 32-bit
/// `usize`.
pub const MAX_UPLOAD_MB: usize = 2048;

/// Admin HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    /// Request body limit for uploads, in MiB.
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
            max_upload_mb: 256,
        }
    }
}

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GalleryConfig::default()).expect("default config must serialize")
}

/// Deep-merge two TOML values. Tables merge key by key; anything else in
/// `overlay` replaces `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge `overlay` onto `base`, deserialize, and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`.
///
/// With `required` false a missing file yields the stock defaults; with
/// `required` true (an explicit `--config`) it is an error.
pub fn load_config(path: &Path, required: bool) -> Result<GalleryConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() && required {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    if overlay.is_some() {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# gallery-ingest configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error. Lists replace the default list as a
# whole; they are not appended to.

# ---------------------------------------------------------------------------
# Paths (relative to the working directory)
# ---------------------------------------------------------------------------
[paths]
# Directory holding the raw photos and videos.
input = "public/gallery"

# Where derivatives are written. Defaults to the input directory, so raw
# files and their web versions sit side by side.
# output = "public/gallery"

# Manifest JSON read by the site.
manifest = "src/data/gallery-processed.json"

# URL prefix the output directory is served under; src/poster in the
# manifest are "<public_prefix>/<file>".
public_prefix = "/gallery"

# ---------------------------------------------------------------------------
# Still images -> AVIF
# ---------------------------------------------------------------------------
[images]
# Bounding box. Images are scaled down to fit, never up.
max_width = 1200
max_height = 1800

# AVIF encoding quality (1 = worst, 100 = best).
quality = 80

# ---------------------------------------------------------------------------
# Videos -> H.264/AAC MP4 + AVIF poster
# ---------------------------------------------------------------------------
[video]
# Height ceiling in pixels. Width follows the aspect ratio.
max_height = 720

# x264 constant rate factor, 0-51 (lower = better and larger).
crf = 28

# x264 preset (ultrafast ... veryslow).
preset = "fast"

audio_bitrate = "128k"

# Where the poster frame is taken. Clips shorter than this use the first
# frame.
poster_offset = "00:00:01"

# Poster bounding box and quality.
poster_max_width = 720
poster_max_height = 1280
poster_quality = 80

# ---------------------------------------------------------------------------
# Inline blur preview (base64 JPEG embedded in the manifest)
# ---------------------------------------------------------------------------
[preview]
max_width = 10
max_height = 10
quality = 20

# ---------------------------------------------------------------------------
# External tools
# ---------------------------------------------------------------------------
[tools]
# ffmpeg executable (name on PATH or absolute path).
ffmpeg = "ffmpeg"

# Seconds before a single ffmpeg run is killed.
timeout_secs = 600

# ---------------------------------------------------------------------------
# Generated metadata
# ---------------------------------------------------------------------------
[metadata]
site_name = "Kaya Planet"

# Appended to every item's hashtags.
brand_tag = "kayaplanetbride"

# Per-subject hashtag: prefix + subject name (e.g. "brideaish").
subject_tag_prefix = "bride"

# Number of pool hashtags at the start of each item's list.
hashtag_count = 4

hashtags = [
    "bestbridalmakeupkanpur",
    "makeupartistinkanpur",
    "bridalmakeup",
    "indianbride",
    "weddingmakeup",
    "kanpurmakeupartist",
    "softglam",
    "engagementmakeup",
    "hdmakeupkanpur",
]

# Alt text is "<phrase> - <subject> Look <slot>", the phrase rotating with
# the slot number and subject name length.
phrases = [
    "Best Bridal Makeup in Kanpur",
    "Soft Engagement Look Kanpur",
    "Professional Bridal Makeover",
    "Luxury Wedding Makeup Artist",
    "Top Rated Makeup Academy Kanpur",
]

# Hashtags for uploaded items, after the brand tag.
upload_hashtags = ["bridalmakeup"]

# Badge table. The first token found (case-insensitive) in the subject name
# wins. Uploads pick a badge by its type.
[[metadata.badges]]
token = "Aish"
label = "Real Bride"
type = "real-bride"

[[metadata.badges]]
token = "Raadhya"
label = "Signature"
type = "signature"

# ---------------------------------------------------------------------------
# Admin server (gallery-ingest serve)
# ---------------------------------------------------------------------------
[server]
bind = "127.0.0.1:3000"

# Largest accepted upload, in MiB (1-2048).
max_upload_mb = 256
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_paths() {
        let config = GalleryConfig::default();
        assert_eq!(config.input_dir(), PathBuf::from("public/gallery"));
        assert_eq!(config.output_dir(), PathBuf::from("public/gallery"));
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("src/data/gallery-processed.json")
        );
        assert_eq!(config.public_prefix(), "/gallery");
    }

    #[test]
    fn default_transcode_settings_match_stock() {
        assert_eq!(
            GalleryConfig::default().transcode_settings(),
            TranscodeSettings::default()
        );
    }

    #[test]
    fn parse_partial_config() {
        let config: GalleryConfig = toml::from_str(
            r#"
[images]
quality = 70
"#,
        )
        .unwrap();
        assert_eq!(config.images.quality, 70);
        assert_eq!(config.images.max_width, 1200);
        assert_eq!(config.video.crf, 28);
    }

    #[test]
    fn badge_table_uses_type_key() {
        let config: GalleryConfig = toml::from_str(
            r#"
[[metadata.badges]]
token = "Meera"
label = "Editor's Pick"
type = "pick"
"#,
        )
        .unwrap();
        assert_eq!(
            config.metadata.badges,
            vec![BadgeRule::new("Meera", "Editor's Pick", "pick")]
        );
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_nested_tables_keep_base_keys() {
        let merged = merge_toml(
            stock_defaults_value(),
            toml::from_str("[video]\ncrf = 23").unwrap(),
        );
        assert_eq!(merged["video"]["crf"].as_integer(), Some(23));
        assert_eq!(merged["video"]["preset"].as_str(), Some("fast"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let merged = merge_toml(
            stock_defaults_value(),
            toml::from_str("[metadata]\nphrases = [\"Only one\"]").unwrap(),
        );
        let config: GalleryConfig = merged.try_into().unwrap();
        assert_eq!(config.metadata.phrases, vec!["Only one"]);
        assert_eq!(config.metadata.hashtags.len(), 9);
    }

    // =========================================================================
    // validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        GalleryConfig::default().validate().unwrap();
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<GalleryConfig, _> = toml::from_str("[images]\nqualty = 80");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<GalleryConfig, _> = toml::from_str("[thumbnails]\nsize = 1");
        assert!(result.is_err());
    }

    #[test]
    fn validate_quality_range() {
        let mut config = GalleryConfig::default();
        config.preview.quality = 0;
        assert!(config.validate().is_err());
        config.preview.quality = 101;
        assert!(config.validate().is_err());
        config.preview.quality = 100;
        config.validate().unwrap();
    }

    #[test]
    fn validate_zero_box() {
        let mut config = GalleryConfig::default();
        config.video.poster_max_height = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("video.poster"));
    }

    #[test]
    fn validate_empty_phrase_pool() {
        let mut config = GalleryConfig::default();
        config.metadata.phrases.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_timeout() {
        let mut config = GalleryConfig::default();
        config.tools.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_upload_limit() {
        let mut config = GalleryConfig::default();
        config.server.max_upload_mb = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.max_upload_mb"));
        config.server.max_upload_mb = usize::MAX;
        assert!(config.validate().is_err());
        config.server.max_upload_mb = MAX_UPLOAD_MB;
        config.validate().unwrap();
    }

    #[test]
    fn validate_public_prefix() {
        let mut config = GalleryConfig::default();
        config.paths.public_prefix = "gallery".into();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn optional_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("gallery.toml"), false).unwrap();
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn required_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(&tmp.path().join("custom.toml"), true);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_config_reads_and_merges_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(
            &path,
            r#"
[paths]
input = "raw"
output = "web"

[tools]
timeout_secs = 30
"#,
        )
        .unwrap();

        let config = load_config(&path, true).unwrap();
        assert_eq!(config.input_dir(), PathBuf::from("raw"));
        assert_eq!(config.output_dir(), PathBuf::from("web"));
        assert_eq!(config.tool_timeout(), Duration::from_secs(30));
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(&path, "[images]\nquality = 0\n").unwrap();
        assert!(matches!(
            load_config(&path, true),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(&path, "[images\n").unwrap();
        assert!(matches!(load_config(&path, true), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn overrides_replace_paths() {
        let mut config = GalleryConfig::default();
        config.apply_overrides(&PathOverrides {
            input: Some("in".into()),
            output: None,
            manifest: Some("out/m.json".into()),
        });
        assert_eq!(config.input_dir(), PathBuf::from("in"));
        assert_eq!(config.output_dir(), PathBuf::from("in"));
        assert_eq!(config.manifest_path(), PathBuf::from("out/m.json"));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: GalleryConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[paths]",
            "[images]",
            "[video]",
            "[preview]",
            "[tools]",
            "[metadata]",
            "[[metadata.badges]]",
            "[server]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        let table = val.as_table().unwrap();
        for key in ["paths", "images", "video", "preview", "tools", "metadata", "server"] {
            assert!(table.contains_key(key), "missing {key}");
        }
        assert!(table["paths"].get("output").is_none());
    }
}
