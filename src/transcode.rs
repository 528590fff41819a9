//! Media transcoding: one raw file in, one web derivative (plus poster and
//! inline preview) out.
//!
//! ## Stages
//!
//! ```text
//! pending → transcoding → poster extraction (video only) → preview → done
//!               │                 │                          │
//!               └── failed ◄──────┘                          └── blur_data = None
//! ```
//!
//! A failure in the first two stages fails the item; a preview failure is
//! logged and only costs the placeholder.
//!
//! ## Images
//!
//! The [`ImageBackend`] decodes, orients, fits the image into the box, and
//! encodes AVIF. When it cannot decode the source (HEIC, AVIF input) the
//! [`VideoTool`] renders a still JPEG and the encode is retried once on that.
//!
//! ## Videos
//!
//! The [`VideoTool`] compresses to H.264/AAC, then grabs one frame of the
//! compressed file which goes through the image path with the poster box.
//! The poster's dimensions are the item's dimensions.
//!
//! ## Staging
//!
//! Outputs are written into a hidden temporary directory inside the output
//! directory and renamed into place only after every required stage
//! succeeded. The directory is removed on drop, on every exit path.

use crate::ffmpeg::{CompressParams, ToolError, VideoTool};
use crate::imaging::{
    BackendError, Dimensions, EncodeBox, ImageBackend, Quality, blur_data_uri, encode_derivative,
};
use crate::naming;
use crate::types::MediaKind;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

/// Frame offset used when the configured one lies past the end of the clip.
const FIRST_FRAME: &str = "00:00:00";

/// Pipeline stage an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcoding,
    PosterExtraction,
    PreviewGeneration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transcoding => "transcoding",
            Self::PosterExtraction => "poster extraction",
            Self::PreviewGeneration => "preview generation",
        })
    }
}

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("{stage} failed: {source}")]
    Backend { stage: Stage, source: BackendError },
    #[error("{stage} failed: {source}")]
    Tool { stage: Stage, source: ToolError },
    #[error("{stage} failed: IO error: {source}")]
    Io {
        stage: Stage,
        source: std::io::Error,
    },
}

impl TranscodeError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Backend { stage, .. } | Self::Tool { stage, .. } | Self::Io { stage, .. } => {
                *stage
            }
        }
    }
}

fn io_at(stage: Stage) -> impl FnOnce(std::io::Error) -> TranscodeError {
    move |source| TranscodeError::Io { stage, source }
}

fn backend_at(stage: Stage) -> impl FnOnce(BackendError) -> TranscodeError {
    move |source| TranscodeError::Backend { stage, source }
}

fn tool_at(stage: Stage) -> impl FnOnce(ToolError) -> TranscodeError {
    move |source| TranscodeError::Tool { stage, source }
}

/// Video encoding settings.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    pub max_height: u32,
    pub crf: u32,
    pub preset: String,
    pub audio_bitrate: String,
    /// Poster frame offset, `HH:MM:SS`.
    pub poster_offset: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            max_height: 720,
            crf: 28,
            preset: "fast".into(),
            audio_bitrate: "128k".into(),
            poster_offset: "00:00:01".into(),
        }
    }
}

/// Everything a transcoder needs to know besides the job itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeSettings {
    pub image: EncodeBox,
    pub poster: EncodeBox,
    pub preview: EncodeBox,
    pub video: VideoSettings,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            image: EncodeBox {
                max_width: 1200,
                max_height: 1800,
                quality: Quality::new(80),
            },
            poster: EncodeBox {
                max_width: 720,
                max_height: 1280,
                quality: Quality::new(80),
            },
            preview: EncodeBox {
                max_width: 10,
                max_height: 10,
                quality: Quality::new(20),
            },
            video: VideoSettings::default(),
        }
    }
}

/// One file to transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    /// Derivative filename inside `output_dir`.
    pub derivative: String,
}

impl TranscodeJob {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.derivative)
    }

    /// True when the raw file is itself the derivative from an earlier run.
    pub fn reuses_output(&self) -> bool {
        self.source == self.output_path()
    }
}

/// A finished derivative, ready for metadata synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivative {
    pub kind: MediaKind,
    pub filename: String,
    pub poster: Option<String>,
    pub width: u32,
    pub height: u32,
    pub blur_data: Option<String>,
}

/// Shared capability of the image and video transcoders.
pub trait Transcoder {
    fn transcode(&self, job: &TranscodeJob) -> Result<Derivative, TranscodeError>;
}

fn staging_dir(output_dir: &Path) -> Result<TempDir, TranscodeError> {
    fs::create_dir_all(output_dir).map_err(io_at(Stage::Transcoding))?;
    tempfile::Builder::new()
        .prefix(".transcode-")
        .tempdir_in(output_dir)
        .map_err(io_at(Stage::Transcoding))
}

/// Run `op` on `source`; if the backend cannot decode it, render a still
/// with the video tool and run `op` on that instead.
///
/// Returns the result and the path that decoded.
fn with_still_fallback<T, V: VideoTool>(
    tool: &V,
    source: &Path,
    staging: &Path,
    stage: Stage,
    op: impl Fn(&Path) -> Result<T, BackendError>,
) -> Result<(T, PathBuf), TranscodeError> {
    match op(source) {
        Ok(value) => Ok((value, source.to_path_buf())),
        Err(err) if err.is_decode() => {
            tracing::info!(source = %source.display(), "decode failed, rendering still frame");
            let still = staging.join("still.jpg");
            if !still.exists() {
                tool.render_still(source, &still).map_err(tool_at(stage))?;
            }
            let value = op(&still).map_err(backend_at(stage))?;
            Ok((value, still))
        }
        Err(err) => Err(backend_at(stage)(err)),
    }
}

/// Preview is best-effort.
fn try_preview<B: ImageBackend, V: VideoTool>(
    backend: &B,
    tool: &V,
    pixels: &Path,
    staging: &Path,
    settings: &TranscodeSettings,
) -> Option<String> {
    let result = with_still_fallback(tool, pixels, staging, Stage::PreviewGeneration, |p| {
        blur_data_uri(backend, p, &settings.preview)
    });
    match result {
        Ok((uri, _)) => Some(uri),
        Err(e) => {
            tracing::warn!(source = %pixels.display(), error = %e, "no inline preview");
            None
        }
    }
}

/// A non-empty file at `path`. Empty files are reserved names, not output.
fn has_derivative(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

fn promote(staged: &Path, target: &Path, stage: Stage) -> Result<(), TranscodeError> {
    fs::rename(staged, target).map_err(io_at(stage))
}

/// Still images: orient, fit, encode AVIF.
pub struct ImageTranscoder<'a, B: ImageBackend, V: VideoTool> {
    pub backend: &'a B,
    pub tool: &'a V,
    pub settings: &'a TranscodeSettings,
}

impl<B: ImageBackend, V: VideoTool> Transcoder for ImageTranscoder<'_, B, V> {
    fn transcode(&self, job: &TranscodeJob) -> Result<Derivative, TranscodeError> {
        let staging = staging_dir(&job.output_dir)?;
        let target = job.output_path();

        let (dims, pixels) = if job.reuses_output() {
            tracing::debug!(file = %job.derivative, "reusing existing derivative");
            let dims = self
                .backend
                .identify(&target)
                .map_err(backend_at(Stage::Transcoding))?;
            (dims, target.clone())
        } else {
            let staged = staging.path().join(&job.derivative);
            let (dims, pixels) = with_still_fallback(
                self.tool,
                &job.source,
                staging.path(),
                Stage::Transcoding,
                |src| encode_derivative(self.backend, src, &staged, &self.settings.image),
            )?;
            promote(&staged, &target, Stage::Transcoding)?;
            (dims, pixels)
        };

        let blur_data = try_preview(self.backend, self.tool, &pixels, staging.path(), self.settings);

        Ok(Derivative {
            kind: MediaKind::Image,
            filename: job.derivative.clone(),
            poster: None,
            width: dims.width,
            height: dims.height,
            blur_data,
        })
    }
}

/// Videos: compress, extract a poster frame, encode the poster.
pub struct VideoTranscoder<'a, B: ImageBackend, V: VideoTool> {
    pub backend: &'a B,
    pub tool: &'a V,
    pub settings: &'a TranscodeSettings,
}

impl<B: ImageBackend, V: VideoTool> VideoTranscoder<'_, B, V> {
    /// Compress into `staged`. `Ok(false)` means an existing derivative is
    /// kept instead.
    fn compress(&self, job: &TranscodeJob, staged: &Path) -> Result<bool, TranscodeError> {
        if job.reuses_output() {
            tracing::debug!(file = %job.derivative, "reusing existing derivative");
            return Ok(false);
        }
        let video = &self.settings.video;
        let params = CompressParams {
            source: job.source.clone(),
            output: staged.to_path_buf(),
            max_height: video.max_height,
            crf: video.crf,
            preset: video.preset.clone(),
            audio_bitrate: video.audio_bitrate.clone(),
        };
        match self.tool.compress(&params) {
            Ok(()) => Ok(true),
            Err(e) if has_derivative(&job.output_path()) => {
                tracing::warn!(
                    source = %job.source.display(),
                    error = %e,
                    "compression failed, keeping existing derivative"
                );
                Ok(false)
            }
            Err(e) => Err(tool_at(Stage::Transcoding)(e)),
        }
    }

    fn extract_frame(&self, video: &Path, frame: &Path) -> Result<(), TranscodeError> {
        let offset = &self.settings.video.poster_offset;
        match self.tool.extract_frame(video, offset, frame) {
            Err(ToolError::NoOutput(_)) if offset != FIRST_FRAME => {
                tracing::debug!(video = %video.display(), "clip shorter than poster offset");
                self.tool
                    .extract_frame(video, FIRST_FRAME, frame)
                    .map_err(tool_at(Stage::PosterExtraction))
            }
            other => other.map_err(tool_at(Stage::PosterExtraction)),
        }
    }
}

impl<B: ImageBackend, V: VideoTool> Transcoder for VideoTranscoder<'_, B, V> {
    fn transcode(&self, job: &TranscodeJob) -> Result<Derivative, TranscodeError> {
        let staging = staging_dir(&job.output_dir)?;
        let staged_video = staging.path().join(&job.derivative);
        let compressed = self.compress(job, &staged_video)?;

        // The poster must describe the derivative, so the frame comes from it.
        let video = if compressed {
            staged_video.clone()
        } else {
            job.output_path()
        };
        let frame = staging.path().join("frame.jpg");
        self.extract_frame(&video, &frame)?;

        let poster_name = naming::poster_name(&job.derivative);
        let staged_poster = staging.path().join(&poster_name);
        let dims: Dimensions =
            encode_derivative(self.backend, &frame, &staged_poster, &self.settings.poster)
                .map_err(backend_at(Stage::PosterExtraction))?;

        if compressed {
            promote(&staged_video, &job.output_path(), Stage::Transcoding)?;
        }
        promote(
            &staged_poster,
            &job.output_dir.join(&poster_name),
            Stage::PosterExtraction,
        )?;

        let blur_data = try_preview(self.backend, self.tool, &frame, staging.path(), self.settings);

        Ok(Derivative {
            kind: MediaKind::Video,
            filename: job.derivative.clone(),
            poster: Some(poster_name),
            width: dims.width,
            height: dims.height,
            blur_data,
        })
    }
}

/// Dispatches to the image or video transcoder by [`MediaKind`].
pub struct MediaTranscoder<'a, B: ImageBackend, V: VideoTool> {
    image: ImageTranscoder<'a, B, V>,
    video: VideoTranscoder<'a, B, V>,
}

impl<'a, B: ImageBackend, V: VideoTool> MediaTranscoder<'a, B, V> {
    pub fn new(backend: &'a B, tool: &'a V, settings: &'a TranscodeSettings) -> Self {
        Self {
            image: ImageTranscoder {
                backend,
                tool,
                settings,
            },
            video: VideoTranscoder {
                backend,
                tool,
                settings,
            },
        }
    }

    pub fn for_kind(&self, kind: MediaKind) -> &dyn Transcoder {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::Video => &self.video,
        }
    }

    pub fn transcode(&self, kind: MediaKind, job: &TranscodeJob) -> Result<Derivative, TranscodeError> {
        self.for_kind(kind).transcode(job)
    }
}
