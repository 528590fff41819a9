//! External video tool: compression, poster frames, and still rendering.
//!
//! Everything here shells out to the system `ffmpeg` binary. The
//! [`VideoTool`] trait is the seam the transcoder depends on; tests swap in
//! a mock that writes placeholder files instead of spawning processes.
//!
//! | Operation | ffmpeg invocation |
//! |---|---|
//! | [`compress`](VideoTool::compress) | `-vf scale=-2:'min(H,ih)' -c:v libx264 -crf N -preset P -c:a aac -b:a R -movflags +faststart` |
//! | [`extract_frame`](VideoTool::extract_frame) | `-ss OFFSET -i video -frames:v 1 -q:v 2 frame.jpg` |
//! | [`render_still`](VideoTool::render_still) | `-i input -frames:v 1 -q:v 2 still.jpg` (HEIC, AVIF, anything the image crate cannot read) |
//!
//! Every invocation runs with `-nostdin -loglevel error` and a wall-clock
//! timeout. Stderr is drained on a separate thread so a chatty process can
//! never block on a full pipe, and it is attached to the error on failure.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Stderr is truncated to this many bytes in error messages.
const STDERR_LIMIT: usize = 2000;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0} not found (is it installed and on PATH?)")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} timed out after {seconds}s")]
    TimedOut { program: String, seconds: u64 },
    #[error("{0} produced no output")]
    NoOutput(PathBuf),
}

/// Settings for one web-compression run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Target height; shorter sources keep their height.
    pub max_height: u32,
    pub crf: u32,
    pub preset: String,
    pub audio_bitrate: String,
}

/// Operations the transcoder needs from an external video tool.
pub trait VideoTool: Sync {
    /// Re-encode `params.source` to an H.264/AAC MP4 at `params.output`.
    fn compress(&self, params: &CompressParams) -> Result<(), ToolError>;

    /// Grab a single frame at `offset` (`HH:MM:SS`) as a JPEG.
    fn extract_frame(&self, video: &Path, offset: &str, output: &Path) -> Result<(), ToolError>;

    /// Render the first frame of any input ffmpeg can read to a JPEG.
    fn render_still(&self, input: &Path, output: &Path) -> Result<(), ToolError>;
}

/// The system `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: String,
    timeout: Duration,
}

impl Ffmpeg {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn run(&self, args: Vec<OsString>, output: &Path) -> Result<(), ToolError> {
        let mut full: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
            .into_iter()
            .map(OsString::from)
            .collect();
        full.extend(args);

        tracing::debug!(program = %self.program, output = %output.display(), "running");
        run_tool(&self.program, &full, self.timeout)?;

        if !output.is_file() {
            return Err(ToolError::NoOutput(output.to_path_buf()));
        }
        Ok(())
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", Duration::from_secs(600))
    }
}

impl VideoTool for Ffmpeg {
    fn compress(&self, params: &CompressParams) -> Result<(), ToolError> {
        self.run(compress_args(params), &params.output)
    }

    fn extract_frame(&self, video: &Path, offset: &str, output: &Path) -> Result<(), ToolError> {
        self.run(frame_args(video, offset, output), output)
    }

    fn render_still(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        self.run(still_args(input, output), output)
    }
}

pub fn compress_args(params: &CompressParams) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), params.source.clone().into_os_string()];
    args.extend(
        [
            "-vf".to_string(),
            format!("scale=-2:'min({},ih)'", params.max_height),
            "-c:v".into(),
            "libx264".into(),
            "-crf".into(),
            params.crf.to_string(),
            "-preset".into(),
            params.preset.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            params.audio_bitrate.clone(),
            "-movflags".into(),
            "+faststart".into(),
        ]
        .map(OsString::from),
    );
    args.push(params.output.clone().into_os_string());
    args
}

pub fn frame_args(video: &Path, offset: &str, output: &Path) -> Vec<OsString> {
    vec![
        "-ss".into(),
        offset.into(),
        "-i".into(),
        video.as_os_str().to_owned(),
        "-frames:v".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        output.as_os_str().to_owned(),
    ]
}

pub fn still_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.as_os_str().to_owned(),
        "-frames:v".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        output.as_os_str().to_owned(),
    ]
}

/// Spawn `program args...` and wait at most `timeout` for it to exit.
///
/// The child is killed when the deadline passes.
pub fn run_tool(program: &str, args: &[OsString], timeout: Duration) -> Result<(), ToolError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound(program.to_string()),
            _ => ToolError::Io(e),
        })?;

    let stderr_pipe = child.stderr.take();
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(program, seconds = timeout.as_secs(), "killed after timeout");
            return Err(ToolError::TimedOut {
                program: program.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = reader.join().unwrap_or_default();
    if status.success() {
        return Ok(());
    }

    let mut stderr = stderr.trim().to_string();
    if stderr.len() > STDERR_LIMIT {
        let mut cut = STDERR_LIMIT;
        while !stderr.is_char_boundary(cut) {
            cut -= 1;
        }
        stderr.truncate(cut);
    }
    Err(ToolError::Failed {
        program: program.to_string(),
        status: status.to_string(),
        stderr,
    })
}
