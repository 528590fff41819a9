//! Orchestration: batch builds, single uploads, and deletes.
//!
//! ## Batch build
//!
//! ```text
//! scan ──► classify/plan ──► per item: cache? ─hit─► Derivative
//!                                        │miss
//!                                        └──► transcode ──► Derivative
//!                                                              │
//!                            synthesize metadata ◄─────────────┘
//!                                    │
//!              groups (≤3 items) + "Collection N" chunks ──► manifest (atomic)
//! ```
//!
//! Items are processed one at a time, in plan order. A failing item is
//! logged, recorded in the [`BuildReport`], and left out; the run goes on.
//! Only scan and manifest-write failures abort a build.
//!
//! ## Upload and delete
//!
//! Both go through [`ManifestStore`]. Uploads reserve their output names,
//! transcode outside the lock, and only take it to append the finished
//! item. Deletes write the manifest without the entry first and remove its
//! files afterwards, still under the lock.

use crate::cache::{CacheStats, TranscodeCache, hash_file, hash_params};
use crate::classify::{self, IngestPlan, PlannedItem};
use crate::config::GalleryConfig;
use crate::ffmpeg::{Ffmpeg, VideoTool};
use crate::imaging::{ImageBackend, RustBackend};
use crate::manifest::{
    self, GalleryGroup, GalleryItem, Manifest, ManifestError, ManifestStore, add_upload,
    chunk_collection, display_name, remove_item,
};
use crate::metadata::Synthesizer;
use crate::naming;
use crate::scan::{self, ScanError, ScanResult};
use crate::transcode::{
    Derivative, MediaTranscoder, Stage, TranscodeError, TranscodeJob, TranscodeSettings,
};
use crate::types::MediaKind;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Uploaded file is empty")]
    EmptyUpload,
}

/// One item that was dropped from a build.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub file: String,
    pub stage: Stage,
    pub error: String,
}

/// What a batch build did.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub failures: Vec<ItemFailure>,
    pub cache: CacheStats,
    /// Files the scanner filtered out.
    pub skipped: usize,
    /// Files that addressed no slot or a slot above the cap.
    pub unused: usize,
}

impl BuildReport {
    pub fn item_count(&self) -> usize {
        self.manifest.iter().map(|g| g.items.len()).sum()
    }
}

/// A file received by the upload endpoint.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Media kind and a file extension for the staged copy, from the
    /// filename if it has a media extension, else from the MIME type.
    pub fn kind_and_extension(&self) -> Option<(MediaKind, String)> {
        if let Some(ext) = self.file_name.as_deref().and_then(naming::extension_of)
            && let Some(kind) = MediaKind::from_extension(&ext)
        {
            return Some((kind, ext));
        }
        let mime = self.content_type.as_deref()?.to_ascii_lowercase();
        let kind = MediaKind::from_mime(&mime)?;
        let subtype = mime.split_once('/').map(|(_, s)| s).unwrap_or("");
        let ext = match subtype {
            "jpeg" => "jpg",
            "quicktime" => "mov",
            "x-m4v" => "m4v",
            other if MediaKind::from_extension(other) == Some(kind) => other,
            _ => match kind {
                MediaKind::Image => "jpg",
                MediaKind::Video => "mp4",
            },
        };
        Some((kind, ext.to_string()))
    }
}

/// Build the plan for a directory without transcoding anything.
pub fn plan_directory(input_dir: &Path) -> Result<(ScanResult, IngestPlan), PipelineError> {
    let mut scanned = scan::scan(input_dir)?;
    let files = std::mem::take(&mut scanned.files);
    Ok((scanned, classify::plan(files)))
}

/// Run a batch build with the production backend and system ffmpeg.
pub fn build(config: &GalleryConfig, use_cache: bool) -> Result<BuildReport, PipelineError> {
    let backend = RustBackend::new();
    let tool = Ffmpeg::new(config.tools.ffmpeg.clone(), config.tool_timeout());
    Pipeline::new(config, &backend, &tool).build(use_cache)
}

/// The pipeline bound to its collaborators.
pub struct Pipeline<'a, B: ImageBackend, V: VideoTool> {
    config: &'a GalleryConfig,
    backend: &'a B,
    tool: &'a V,
    settings: TranscodeSettings,
}

impl<'a, B: ImageBackend, V: VideoTool> Pipeline<'a, B, V> {
    pub fn new(config: &'a GalleryConfig, backend: &'a B, tool: &'a V) -> Self {
        Self {
            config,
            backend,
            tool,
            settings: config.transcode_settings(),
        }
    }

    fn transcoder(&self) -> MediaTranscoder<'_, B, V> {
        MediaTranscoder::new(self.backend, self.tool, &self.settings)
    }

    /// Scan, transcode, synthesize, and rewrite the manifest.
    pub fn build(&self, use_cache: bool) -> Result<BuildReport, PipelineError> {
        let input_dir = self.config.input_dir();
        let output_dir = self.config.output_dir();
        let (scanned, plan) = plan_directory(&input_dir)?;
        fs::create_dir_all(&output_dir)?;

        let mut cache = if use_cache {
            TranscodeCache::load(&output_dir)
        } else {
            TranscodeCache::empty()
        };

        let mut report = BuildReport {
            manifest_path: self.config.manifest_path(),
            skipped: scanned.skipped.len(),
            unused: plan.dropped.len() + plan.over_cap.len(),
            ..Default::default()
        };
        let mut live = BTreeSet::new();
        let synth = Synthesizer::new(&self.config.metadata);
        let prefix = self.config.public_prefix();

        tracing::info!(
            groups = plan.groups.len(),
            collection = plan.collection.len(),
            items = plan.item_count(),
            "starting build"
        );

        for group in &plan.groups {
            let mut items = Vec::new();
            for planned in &group.items {
                if let Some(d) = self.ingest(planned, &mut cache, &mut report, &mut live) {
                    let meta = synth.for_subject(&planned.subject, planned.slot, d.kind);
                    items.push(GalleryItem::new(&d, meta, prefix));
                }
            }
            if items.is_empty() {
                tracing::warn!(subject = %group.subject, "no items survived, dropping group");
                continue;
            }
            report.manifest.push(GalleryGroup {
                group: display_name(&group.subject),
                items,
            });
        }

        let mut collection = Vec::new();
        for planned in &plan.collection {
            if let Some(d) = self.ingest(planned, &mut cache, &mut report, &mut live) {
                let meta = synth.for_subject(&planned.subject, planned.slot, d.kind);
                collection.push(GalleryItem::new(&d, meta, prefix));
            }
        }
        report.manifest.extend(chunk_collection(collection));

        manifest::write_atomic(&report.manifest_path, &report.manifest)?;
        tracing::info!(
            path = %report.manifest_path.display(),
            groups = report.manifest.len(),
            items = report.item_count(),
            "wrote manifest"
        );

        cache.retain_only(&live);
        if let Err(e) = cache.save(&output_dir) {
            tracing::warn!(error = %e, "could not save transcode cache");
        }

        Ok(report)
    }

    /// Transcode one planned item, consulting the cache. Failures are
    /// recorded in `report` and yield `None`.
    fn ingest(
        &self,
        planned: &PlannedItem,
        cache: &mut TranscodeCache,
        report: &mut BuildReport,
        live: &mut BTreeSet<String>,
    ) -> Option<Derivative> {
        let job = TranscodeJob {
            source: self.config.input_dir().join(&planned.file.filename),
            output_dir: self.config.output_dir(),
            derivative: planned.derivative_name(),
        };
        let kind = planned.file.kind;

        let result = (|| {
            let source_hash = hash_file(&job.source).map_err(|source| TranscodeError::Io {
                stage: Stage::Transcoding,
                source,
            })?;
            let params_hash = hash_params(kind, &self.settings);

            if let Some(hit) =
                cache.find(&job.derivative, kind, &source_hash, &params_hash, &job.output_dir)
            {
                tracing::debug!(file = %planned.file.filename, derivative = %job.derivative, "cache hit");
                report.cache.hit();
                return Ok(hit);
            }

            report.cache.miss();
            tracing::info!(file = %planned.file.filename, derivative = %job.derivative, "transcoding");
            let derivative = self.transcoder().transcode(kind, &job)?;
            cache.insert(&derivative, source_hash, params_hash);
            Ok::<_, TranscodeError>(derivative)
        })();

        match result {
            Ok(d) => {
                live.insert(d.filename.clone());
                Some(d)
            }
            Err(e) => {
                tracing::warn!(file = %planned.file.filename, stage = %e.stage(), error = %e, "item failed");
                report.failures.push(ItemFailure {
                    file: planned.file.filename.clone(),
                    stage: e.stage(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Transcode an uploaded file and append it to the `Uploads` group.
    pub fn upload(
        &self,
        store: &ManifestStore,
        upload: &Upload,
        badge: Option<&str>,
    ) -> Result<GalleryItem, PipelineError> {
        if upload.bytes.is_empty() {
            return Err(PipelineError::EmptyUpload);
        }
        let (kind, ext) = upload.kind_and_extension().ok_or_else(|| {
            PipelineError::UnsupportedType(
                upload
                    .content_type
                    .clone()
                    .or_else(|| upload.file_name.clone())
                    .unwrap_or_else(|| "unknown".into()),
            )
        })?;

        let output_dir = self.config.output_dir();
        fs::create_dir_all(&output_dir)?;
        let (id, derivative, reservation) = reserve_upload(&output_dir, kind, now_millis())?;

        let mut staged = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(&format!(".{ext}"))
            .tempfile_in(&output_dir)?;
        std::io::Write::write_all(&mut staged, &upload.bytes)?;
        staged.as_file().sync_all()?;

        let job = TranscodeJob {
            source: staged.path().to_path_buf(),
            output_dir: output_dir.clone(),
            derivative,
        };
        tracing::info!(id, kind = kind.label(), bytes = upload.bytes.len(), "transcoding upload");
        let d = self.transcoder().transcode(kind, &job)?;

        let meta = Synthesizer::new(&self.config.metadata).for_upload(id, kind, badge);
        let item = GalleryItem::new(&d, meta, self.config.public_prefix());

        let appended = item.clone();
        store.update(move |m| {
            add_upload(m, appended);
            Ok(())
        })?;
        reservation.keep();

        tracing::info!(src = %item.src, "upload added");
        Ok(item)
    }

    /// Remove the item with this `src`, then its files.
    ///
    /// The manifest is written first. A file that cannot be removed is left
    /// behind as an orphan and logged; the manifest never points at a
    /// missing file.
    pub fn delete(&self, store: &ManifestStore, src: &str) -> Result<GalleryItem, PipelineError> {
        let output_dir = self.config.output_dir();
        let prefix = self.config.public_prefix();

        let removed = store.update_then(
            |m| remove_item(m, src),
            |item| {
                let urls = std::iter::once(item.src.as_str()).chain(item.poster.as_deref());
                for url in urls {
                    match local_file(&output_dir, prefix, url) {
                        Some(path) => match fs::remove_file(&path) {
                            Ok(()) => tracing::info!(file = %path.display(), "deleted"),
                            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                                tracing::debug!(file = %path.display(), "already gone");
                            }
                            Err(e) => {
                                tracing::warn!(file = %path.display(), error = %e, "could not delete file");
                            }
                        },
                        None => tracing::warn!(url, "not inside the output directory, file left alone"),
                    }
                }
            },
        )?;
        Ok(removed)
    }
}

/// Map a public URL back to a file directly inside `output_dir`.
///
/// Anything that is not `{prefix}/{plain filename}` yields `None`.
pub fn local_file(output_dir: &Path, prefix: &str, url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix(prefix)?.strip_prefix('/')?;
    let mut components = Path::new(rest).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Some(output_dir.join(name)),
        _ => None,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Output names claimed for an upload in progress. The files are removed
/// on drop unless [`keep`](Self::keep) was called.
struct UploadReservation {
    paths: Vec<PathBuf>,
    kept: bool,
}

impl UploadReservation {
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for UploadReservation {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        for path in &self.paths {
            if let Err(e) = fs::remove_file(path) {
                tracing::debug!(file = %path.display(), error = %e, "cleanup failed");
            }
        }
    }
}

/// Claim `upload_{id}` output names, starting at `first_id` and bumping the
/// id while the derivative or poster name is taken.
///
/// Each name is created empty with `create_new`, so two uploads can never
/// end up with the same id, in this process or another.
fn reserve_upload(
    output_dir: &Path,
    kind: MediaKind,
    first_id: u64,
) -> std::io::Result<(u64, String, UploadReservation)> {
    let mut id = first_id;
    loop {
        let name = naming::upload_name(id, kind);
        let mut names = vec![name.clone()];
        if kind == MediaKind::Video {
            names.push(naming::poster_name(&name));
        }

        let mut reservation = UploadReservation {
            paths: Vec::new(),
            kept: false,
        };
        let mut taken = false;
        for n in &names {
            let path = output_dir.join(n);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => reservation.paths.push(path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    taken = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if !taken {
            return Ok((id, name, reservation));
        }
        id += 1;
    }
}
