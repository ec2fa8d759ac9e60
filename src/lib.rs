//! # ffpro - progress bar for ffmpeg
//!
//! `ffpro` watches the log output of a running ffmpeg and turns it into a
//! single live status line: a bar, frames done out of the total, encoder
//! fps, speed and an ETA.
//!
//! ## Features
//!
//! - Works with any ffmpeg command, no `-progress` flag needed
//! - Picks up frame rate and duration from the command line (`-r`, `-fpsmax`,
//!   `fps=` filters, `-t`, `-ss`/`-to`) before ffmpeg prints them
//! - Tolerates partial lines and unknown output
//! - Passes ffmpeg's "overwrite?" question through to the user
//!
//! ## Example
//!
//! ```no_run
//! use ffpro::{MemoryDisplay, ProgressMonitor, Renderer};
//!
//! let args = ["-i", "in.mkv", "-r", "30", "-t", "10", "out.mp4"];
//! let monitor = ProgressMonitor::from_args(&args, Renderer::default(), MemoryDisplay::default());
//!
//! let display = monitor.run(["frame=  150 fps= 60 q=28.0 speed=2.0x"]);
//! println!("{}", display.current().unwrap_or_default());
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod display;
pub mod monitor;
pub mod prescan;
pub mod render;
pub mod timecode;

pub use display::{DisplaySink, MemoryDisplay, TerminalDisplay};
pub use monitor::{run, run_reader, ChunkOutcome, MonitorState, Phase, ProgressMonitor, ProgressSample};
pub use prescan::{scan_duration, scan_frame_rate, stdin_is_spoken_for, Seeds};
pub use render::{ProgressReport, Renderer};
pub use timecode::{format_clock, to_seconds, ToSeconds};

/// Environment variable naming the ffmpeg binary; beats the config file.
pub const FFMPEG_ENV: &str = "FFPRO_FFMPEG";

const CONFIG_NAMES: &[&str] = &["ffpro.toml", "ffpro.json"];

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_label() -> String {
    "ffmpeg".to_string()
}

fn default_bar_ratio() -> f64 {
    0.3
}

fn default_fallback_columns() -> u16 {
    80
}

fn default_true() -> bool {
    true
}

/// User configuration, read from `ffpro.toml` or `ffpro.json`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// ffmpeg binary to run
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    /// Text in front of the bar
    #[serde(default = "default_label")]
    pub label: String,
    /// Share of the terminal width used by the bar, in (0, 1]
    #[serde(default = "default_bar_ratio")]
    pub bar_ratio: f64,
    /// Width assumed when the terminal size is unknown
    #[serde(default = "default_fallback_columns")]
    pub fallback_columns: u16,
    #[serde(default = "default_true")]
    pub color: bool,
    /// Answer overwrite questions through a confirmation prompt instead of
    /// echoing them and leaving stdin to ffmpeg
    #[serde(default)]
    pub confirm_overwrite: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            label: default_label(),
            bar_ratio: default_bar_ratio(),
            fallback_columns: default_fallback_columns(),
            color: true,
            confirm_overwrite: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a file; the extension picks the format.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;

        let cfg: AppConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&text).context("parsing config toml")?,
            Some("json") => serde_json::from_str(&text).context("parsing config json")?,
            _ => {
                return Err(anyhow!(
                    "Unsupported config format for {} (expected .toml or .json)",
                    path.display()
                ))
            }
        };

        cfg.validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    /// Config file locations, most specific first: the user config
    /// directory, then the current directory.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut tried: Vec<PathBuf> = Vec::new();
        if let Some(d) = dirs::config_dir() {
            let d = d.join("ffpro");
            tried.extend(CONFIG_NAMES.iter().map(|name| d.join(name)));
        }
        tried.extend(CONFIG_NAMES.iter().map(PathBuf::from));
        tried
    }

    /// First config file that exists among `paths`, or the built-in defaults.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self> {
        match paths.iter().find(|p| p.exists()) {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::search_paths())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bar_ratio > 0.0 && self.bar_ratio <= 1.0) {
            return Err(anyhow!("bar_ratio must be in (0, 1], got {}", self.bar_ratio));
        }
        if self.fallback_columns == 0 {
            return Err(anyhow!("fallback_columns must be greater than 0"));
        }
        if self.ffmpeg.trim().is_empty() {
            return Err(anyhow!("ffmpeg must name a binary"));
        }
        Ok(())
    }

    pub fn renderer(&self) -> Renderer {
        Renderer {
            label: self.label.clone(),
            bar_ratio: self.bar_ratio,
            fallback_columns: self.fallback_columns,
            color: self.color,
        }
    }
}
