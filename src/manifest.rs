//! The gallery manifest: the JSON document the site renders from.
//!
//! ```json
//! [
//!   {
//!     "group": "Aish",
//!     "items": [
//!       {
//!         "type": "image",
//!         "src": "/gallery/bride_aish_1.avif",
//!         "width": 1200, "height": 1800,
//!         "blurData": "data:image/jpeg;base64,...",
//!         "alt": "...", "title": "...",
//!         "hashtags": ["..."],
//!         "badge": "Real Bride", "badgeType": "real-bride"
//!       }
//!     ]
//!   },
//!   { "group": "Collection 1", "items": [ ... ] }
//! ]
//! ```
//!
//! Batch runs regenerate the whole document. The admin API edits it in
//! place through [`ManifestStore`], which serializes read-modify-write
//! cycles so concurrent uploads and deletes never lose each other's
//! changes. Every write goes to a temporary file in the same directory and
//! is renamed over the target, so readers see either the old or the new
//! document, never a torn one.

use crate::classify::MAX_SLOTS;
use crate::metadata::ItemMetadata;
use crate::transcode::Derivative;
use crate::types::MediaKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Name of the group uploads are collected in.
pub const UPLOADS_GROUP: &str = "Uploads";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No gallery item with src {0}")]
    ItemNotFound(String),
    #[error("Manifest lock poisoned")]
    Poisoned,
}

/// One entry in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub blur_data: Option<String>,
    pub alt: String,
    pub title: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub badge_type: Option<String>,
}

impl GalleryItem {
    /// Combine a derivative with its metadata. `prefix` is the public URL
    /// prefix of the output directory, without trailing slash.
    pub fn new(derivative: &Derivative, meta: ItemMetadata, prefix: &str) -> Self {
        let (badge, badge_type) = match meta.badge {
            Some(b) => (Some(b.label), Some(b.badge_type)),
            None => (None, None),
        };
        Self {
            kind: derivative.kind,
            src: public_url(prefix, &derivative.filename),
            poster: derivative.poster.as_deref().map(|p| public_url(prefix, p)),
            width: derivative.width,
            height: derivative.height,
            blur_data: derivative.blur_data.clone(),
            alt: meta.alt,
            title: meta.title,
            hashtags: meta.hashtags,
            badge,
            badge_type,
        }
    }
}

/// A named group of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryGroup {
    pub group: String,
    pub items: Vec<GalleryItem>,
}

pub type Manifest = Vec<GalleryGroup>;

pub fn public_url(prefix: &str, filename: &str) -> String {
    format!("{}/{filename}", prefix.trim_end_matches('/'))
}

/// Display name of a subject group: first letter capitalized.
pub fn display_name(subject: &str) -> String {
    let mut chars = subject.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split collection items into groups of [`MAX_SLOTS`], named
/// `Collection 1`, `Collection 2`, …
pub fn chunk_collection(items: Vec<GalleryItem>) -> Vec<GalleryGroup> {
    let mut groups = Vec::new();
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<GalleryItem> = iter.by_ref().take(MAX_SLOTS as usize).collect();
        groups.push(GalleryGroup {
            group: format!("Collection {}", groups.len() + 1),
            items: chunk,
        });
    }
    groups
}

/// Append an upload to the leading `Uploads` group, creating it at the
/// front if needed.
pub fn add_upload(manifest: &mut Manifest, item: GalleryItem) {
    match manifest.iter_mut().find(|g| g.group == UPLOADS_GROUP) {
        Some(group) => group.items.push(item),
        None => manifest.insert(
            0,
            GalleryGroup {
                group: UPLOADS_GROUP.to_string(),
                items: vec![item],
            },
        ),
    }
}

/// Remove the item whose `src` matches, dropping groups left empty.
pub fn remove_item(manifest: &mut Manifest, src: &str) -> Result<GalleryItem, ManifestError> {
    let (gi, ii) = manifest
        .iter()
        .enumerate()
        .find_map(|(gi, g)| g.items.iter().position(|i| i.src == src).map(|ii| (gi, ii)))
        .ok_or_else(|| ManifestError::ItemNotFound(src.to_string()))?;

    let removed = manifest[gi].items.remove(ii);
    manifest.retain(|g| !g.items.is_empty());
    Ok(removed)
}

/// Read the manifest. A missing file is an empty manifest.
pub fn load(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write `manifest` as pretty JSON via a temp file renamed over `path`.
pub fn write_atomic(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    let json = serde_json::to_string_pretty(manifest)?;
    write_file_atomic(path, json.as_bytes())?;
    Ok(())
}

/// Write `bytes` to a sibling temp file and rename it over `path`.
pub(crate) fn write_file_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Single-writer access to the manifest file.
pub struct ManifestStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Manifest, ManifestError> {
        let _guard = self.lock.lock().map_err(|_| ManifestError::Poisoned)?;
        load(&self.path)
    }

    /// Load, apply `f`, and write back, all under the lock. Nothing is
    /// written if `f` fails.
    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut Manifest) -> Result<T, ManifestError>,
    ) -> Result<T, ManifestError> {
        self.update_then(f, |_| {})
    }

    /// Like [`update`](Self::update), then run `after` on the result once
    /// the new document is on disk, still under the lock. `after` only runs
    /// if the write succeeded.
    pub fn update_then<T>(
        &self,
        f: impl FnOnce(&mut Manifest) -> Result<T, ManifestError>,
        after: impl FnOnce(&T),
    ) -> Result<T, ManifestError> {
        let _guard = self.lock.lock().map_err(|_| ManifestError::Poisoned)?;
        let mut manifest = load(&self.path)?;
        let out = f(&mut manifest)?;
        write_atomic(&self.path, &manifest)?;
        after(&out);
        Ok(out)
    }

    /// Replace the whole document.
    pub fn replace(&self, manifest: &Manifest) -> Result<(), ManifestError> {
        let _guard = self.lock.lock().map_err(|_| ManifestError::Poisoned)?;
        write_atomic(&self.path, manifest)
    }
}
