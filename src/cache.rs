//! Transcode cache for incremental batch runs.
//!
//! Video compression and AVIF encoding dominate a batch run. This module
//! lets the pipeline skip both when the source file and encoding settings
//! haven't changed since the derivative was written.
//!
//! # Design
//!
//! Entries are keyed by derivative filename (`bride_aish_1.avif`), since the
//! derivative name is fully determined by subject, slot and kind. Each entry
//! stores everything the manifest needs from the transcode (dimensions,
//! poster name, inline preview), so a hit skips the external tools
//! entirely. Metadata synthesis always runs, so changing the phrase pool or
//! badge table takes effect without a cache bust.
//!
//! ## Cache keys
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives copies and `git checkout`.
//! - **`params_hash`**: SHA-256 of the settings that shape the output for
//!   that media kind (bounding boxes, qualities, codec settings). Changing
//!   any of them re-encodes.
//!
//! A hit requires:
//! 1. An entry for the derivative name with matching `source_hash` and
//!    `params_hash`
//! 2. The derivative (and, for videos, its poster) still on disk
//!
//! ## Storage
//!
//! `<output_dir>/.cache-manifest.json`, hidden so the scanner never treats
//! it as media. Written atomically after the gallery manifest.
//!
//! ## Bypassing the cache
//!
//! `build --no-cache` starts from an empty cache; every item is re-encoded
//! and the cache is rewritten from scratch.

use crate::imaging::EncodeBox;
use crate::manifest::write_file_atomic;
use crate::transcode::{Derivative, TranscodeSettings};
use crate::types::MediaKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
const CACHE_FILENAME: &str = ".cache-manifest.json";

/// Bump to invalidate every existing cache when the format changes.
const CACHE_VERSION: u32 = 1;

/// A single cached derivative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
    pub width: u32,
    pub height: u32,
    pub blur_data: Option<String>,
    pub poster: Option<String>,
}

/// On-disk cache mapping derivative filenames to their entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeCache {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
}

impl TranscodeCache {
    /// Create an empty cache (used for `--no-cache` or the first run).
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty cache if the file
    /// doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let path = cache_path(output_dir);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::empty();
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(cache) if cache.version == CACHE_VERSION => cache,
            Ok(_) => {
                tracing::info!(path = %path.display(), "cache version changed, starting fresh");
                Self::empty()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache, starting fresh");
                Self::empty()
            }
        }
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_file_atomic(&cache_path(output_dir), json.as_bytes())
    }

    /// Look up a derivative. Returns it only if the hashes match and its
    /// files are still on disk.
    pub fn find(
        &self,
        derivative: &str,
        kind: MediaKind,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> Option<Derivative> {
        let entry = self.entries.get(derivative)?;
        if entry.source_hash != source_hash || entry.params_hash != params_hash {
            return None;
        }
        if !output_dir.join(derivative).is_file() {
            return None;
        }
        if let Some(poster) = &entry.poster
            && !output_dir.join(poster).is_file()
        {
            return None;
        }
        Some(Derivative {
            kind,
            filename: derivative.to_string(),
            poster: entry.poster.clone(),
            width: entry.width,
            height: entry.height,
            blur_data: entry.blur_data.clone(),
        })
    }

    /// Record a freshly transcoded derivative.
    pub fn insert(&mut self, derivative: &Derivative, source_hash: String, params_hash: String) {
        self.entries.insert(
            derivative.filename.clone(),
            CacheEntry {
                source_hash,
                params_hash,
                width: derivative.width,
                height: derivative.height,
                blur_data: derivative.blur_data.clone(),
                poster: derivative.poster.clone(),
            },
        );
    }

    /// Drop entries for derivatives that were not produced this run.
    pub fn retain_only(&mut self, live: &BTreeSet<String>) {
        self.entries.retain(|name, _| live.contains(name));
    }
}

/// Resolve the cache file path for an output directory.
pub fn cache_path(output_dir: &Path) -> PathBuf {
    output_dir.join(CACHE_FILENAME)
}

/// SHA-256 hash of a file's contents, returned as a hex string.
///
/// Streams the file, so large videos are never held in memory.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 hash of the settings that shape a derivative of `kind`.
pub fn hash_params(kind: MediaKind, settings: &TranscodeSettings) -> String {
    fn put_box(hasher: &mut Sha256, b: &EncodeBox) {
        hasher.update(b.max_width.to_le_bytes());
        hasher.update(b.max_height.to_le_bytes());
        hasher.update(b.quality.value().to_le_bytes());
    }

    let mut hasher = Sha256::new();
    match kind {
        MediaKind::Image => {
            hasher.update(b"image\0");
            put_box(&mut hasher, &settings.image);
        }
        MediaKind::Video => {
            let v = &settings.video;
            hasher.update(b"video\0");
            hasher.update(v.max_height.to_le_bytes());
            hasher.update(v.crf.to_le_bytes());
            for s in [&v.preset, &v.audio_bitrate, &v.poster_offset] {
                hasher.update(s.as_bytes());
                hasher.update(b"\0");
            }
            put_box(&mut hasher, &settings.poster);
        }
    }
    put_box(&mut hasher, &settings.preview);
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} transcoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} transcoded", self.misses)
        }
    }
}
