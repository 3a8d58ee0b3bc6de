use anyhow::{bail, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding settings.json, state.json and daily_progress.json.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Where frames are written. Defaults to `<state_dir>/imgs`.
    #[serde(default)]
    pub frames_dir: Option<PathBuf>,

    /// Append-only event log. Defaults to `<state_dir>/log.txt`.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daylapse")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            frames_dir: None,
            event_log: None,
        }
    }
}

impl PathsConfig {
    pub fn frames_dir(&self) -> PathBuf {
        self.frames_dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("imgs"))
    }

    pub fn event_log(&self) -> PathBuf {
        self.event_log
            .clone()
            .unwrap_or_else(|| self.state_dir.join("log.txt"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_location_name")]
    pub name: String,

    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Civil time offset used for calendar dates and log timestamps.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_location_name() -> String {
    "Cluj-Napoca".to_string()
}

fn default_latitude() -> f64 {
    46.7712
}

fn default_longitude() -> f64 {
    23.6236
}

fn default_utc_offset_hours() -> i32 {
    3
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: default_location_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl LocationConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Still-capture program to run once per frame.
    #[serde(default = "default_capture_program")]
    pub program: String,

    /// Arguments; `{output}` is replaced with the frame path.
    #[serde(default = "default_capture_args")]
    pub args: Vec<String>,

    #[serde(default = "default_capture_extension")]
    pub extension: String,
}

fn default_capture_program() -> String {
    "rpicam-still".to_string()
}

fn default_capture_args() -> Vec<String> {
    vec!["-n".to_string(), "-o".to_string(), "{output}".to_string()]
}

fn default_capture_extension() -> String {
    "jpg".to_string()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: default_capture_program(),
            args: default_capture_args(),
            extension: default_capture_extension(),
        }
    }
}

impl Config {
    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let loc = &self.location;
        if !(-90.0..=90.0).contains(&loc.latitude) {
            bail!("latitude {} is out of range [-90, 90]", loc.latitude);
        }
        if !(-180.0..=180.0).contains(&loc.longitude) {
            bail!("longitude {} is out of range [-180, 180]", loc.longitude);
        }
        if !(-12..=14).contains(&loc.utc_offset_hours) {
            bail!("utc_offset_hours {} is out of range [-12, 14]", loc.utc_offset_hours);
        }
        if self.capture.program.trim().is_empty() {
            bail!("capture program must not be empty");
        }
        Ok(())
    }

    /// Notice to report once logging is up when `path` does not exist.
    pub fn missing_file_notice(path: &Path) -> Option<String> {
        (!path.exists()).then(|| format!("Config file not found at {:?}, using defaults", path))
    }

    /// `$DAYLAPSE_CONFIG`, or `config.toml` in the user config directory.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("DAYLAPSE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("daylapse")
            .join("config.toml")
    }
}
