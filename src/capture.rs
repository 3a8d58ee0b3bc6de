//! Single-frame capture through an external still-capture program.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// Produces one image per call, named by the run-wide frame index.
pub trait CaptureInvoker {
    fn capture(&mut self, index: u64) -> Result<PathBuf, CaptureError>;
}

/// Runs a command such as `rpicam-still -n -o <frame>` for each frame.
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
    extension: String,
    frames_dir: PathBuf,
}

impl CommandCapture {
    pub fn new(config: &CaptureConfig, frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            extension: config.extension.clone(),
            frames_dir: frames_dir.into(),
        }
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        frame_path(&self.frames_dir, index, &self.extension)
    }
}

pub fn frame_path(frames_dir: &Path, index: u64, extension: &str) -> PathBuf {
    frames_dir.join(format!("frame{}.{}", index, extension))
}

impl CaptureInvoker for CommandCapture {
    fn capture(&mut self, index: u64) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.frames_dir).map_err(|source| CaptureError::Prepare {
            path: self.frames_dir.clone(),
            source,
        })?;

        let output = self.frame_path(index);
        let output_str = output.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{output}", &output_str))
            .collect();

        tracing::debug!("Running {} {:?}", self.program, args);

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(CaptureError::Failed {
                program: self.program.clone(),
                index,
                status,
            });
        }

        if !output.exists() {
            return Err(CaptureError::MissingArtifact { index, path: output });
        }

        Ok(output)
    }
}
