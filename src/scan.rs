//! Directory scanning: the first step of every batch run.
//!
//! Lists the raw input directory (flat, no recursion) and filters out
//! everything that can never be a source:
//!
//! | Order | Rule | Example |
//! |---|---|---|
//! | 1 | Hidden files | `.DS_Store`, `.cache-manifest.json` |
//! | 2 | Stale / legacy markers | `look_compressed.mp4`, `temp_aish_1.jpg` |
//! | 3 | Non-media extensions | `gallery.json`, `notes.txt` |
//! | 4 | Poster outputs | `bride_aish_2_poster.avif` |
//!
//! The survivors come back as [`RawFile`]s in lexicographic filename order,
//! which is the "discovery order" the rest of the pipeline preserves. Entries
//! are rediscovered on every run; nothing here is persisted.

use crate::naming::{self, POSTER_MARKER};
use crate::types::MediaKind;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input directory not found: {0}")]
    MissingInput(PathBuf),
}

/// A media file found in the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub filename: String,
    /// Lowercased extension without the dot.
    pub extension: String,
    pub kind: MediaKind,
}

impl RawFile {
    /// Build from a bare filename; `None` if the extension is not media.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = naming::extension_of(filename)?;
        let kind = MediaKind::from_extension(&extension)?;
        Some(Self {
            filename: filename.to_string(),
            extension,
            kind,
        })
    }

    pub fn is_derivative(&self) -> bool {
        naming::is_derivative(&self.filename)
    }
}

/// Why an entry was left out of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    Stale,
    NotMedia,
    Poster,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Hidden => "hidden",
            Self::Stale => "stale",
            Self::NotMedia => "not media",
            Self::Poster => "poster output",
        };
        f.write_str(text)
    }
}

/// Result of listing the input directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Media files in discovery order.
    pub files: Vec<RawFile>,
    /// Everything filtered out, with the first rule that matched.
    pub skipped: Vec<(String, SkipReason)>,
}

/// Apply the skip rules in order. `None` means the file is a candidate.
pub fn skip_reason(filename: &str) -> Option<SkipReason> {
    if filename.starts_with('.') {
        return Some(SkipReason::Hidden);
    }
    if filename.contains("compressed") || filename.starts_with("temp_") {
        return Some(SkipReason::Stale);
    }
    if RawFile::from_filename(filename).is_none() {
        return Some(SkipReason::NotMedia);
    }
    if filename.contains(POSTER_MARKER) {
        return Some(SkipReason::Poster);
    }
    None
}

/// List and filter the input directory.
pub fn scan(input_dir: &Path) -> Result<ScanResult, ScanError> {
    if !input_dir.is_dir() {
        return Err(ScanError::MissingInput(input_dir.to_path_buf()));
    }

    let mut names: Vec<String> = fs::read_dir(input_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut result = ScanResult::default();
    for name in names {
        match skip_reason(&name) {
            Some(reason) => {
                tracing::debug!(file = %name, %reason, "skipping");
                result.skipped.push((name, reason));
            }
            None => {
                // skip_reason already checked the extension
                if let Some(raw) = RawFile::from_filename(&name) {
                    result.files.push(raw);
                }
            }
        }
    }

    tracing::info!(
        dir = %input_dir.display(),
        candidates = result.files.len(),
        skipped = result.skipped.len(),
        "scanned input directory"
    );
    Ok(result)
}
