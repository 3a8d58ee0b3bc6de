//! Error types shared by the library.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing one of the persisted documents.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed document {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize {name}: {source}")]
    Serialize {
        name: &'static str,
        source: serde_json::Error,
    },
}

/// The sun does not cross the horizon on the requested date.
#[derive(Debug, Error, PartialEq)]
pub enum SunError {
    #[error("the sun does not rise on {0} at this location (polar night)")]
    NoSunrise(chrono::NaiveDate),

    #[error("the sun does not set on {0} at this location (polar day)")]
    NoSunset(chrono::NaiveDate),
}

/// Failure producing a single frame.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to prepare frames directory {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status} while capturing frame {index}")]
    Failed {
        program: String,
        index: u64,
        status: std::process::ExitStatus,
    },

    #[error("capture of frame {index} produced no file at {path}")]
    MissingArtifact { index: u64, path: PathBuf },
}

/// Top-level error for a scheduler run.
#[derive(Debug, Error)]
pub enum DaylapseError {
    #[error("settings file was not created at {0}")]
    MissingSettings(PathBuf),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sun(#[from] SunError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

pub type Result<T> = std::result::Result<T, DaylapseError>;
