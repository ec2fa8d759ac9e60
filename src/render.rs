//! Status line: numbers derived from a progress sample and how they are drawn.

use console::style;
use std::fmt::Display;

use crate::monitor::ProgressSample;
use crate::timecode::format_clock;

const BAR_CHAR: &str = "━";

/// Numbers derived from one progress sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub frames: u64,
    pub total_frames: f64,
    /// Encoder throughput reported by ffmpeg
    pub fps: f64,
    pub speed: f64,
    /// Seconds left at the current speed, 0 when that can't be computed
    pub remaining_seconds: f64,
    /// Rounded completion, not capped at 100
    pub percentage: u64,
}

impl ProgressReport {
    pub fn new(sample: &ProgressSample, total_frames: f64, stream_fps: f64) -> Self {
        let frames = sample.frames as f64;

        let remaining = (total_frames - frames) / stream_fps / sample.speed;
        let remaining_seconds = if remaining.is_finite() { remaining } else { 0.0 };

        let percentage = (frames / total_frames * 100.0).round() as u64;

        Self {
            frames: sample.frames,
            total_frames,
            fps: sample.fps,
            speed: sample.speed,
            remaining_seconds,
            percentage,
        }
    }

    /// Remaining time as `HH:MM:SS.mmm`.
    pub fn eta(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

/// Builds the status line. Terminal width comes from the caller on every
/// render so a resized terminal is picked up.
#[derive(Debug, Clone)]
pub struct Renderer {
    pub label: String,
    /// Share of the terminal width taken by the bar
    pub bar_ratio: f64,
    /// Width assumed when the display can't tell
    pub fallback_columns: u16,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            label: "ffmpeg".to_string(),
            bar_ratio: 0.3,
            fallback_columns: 80,
            color: true,
        }
    }
}

impl Renderer {
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn bar_width(&self, columns: Option<u16>) -> usize {
        let columns = columns.unwrap_or(self.fallback_columns);
        (f64::from(columns) * self.bar_ratio).round() as usize
    }

    /// Number of filled cells; an overshooting percentage fills the bar.
    pub fn filled_cells(bar_width: usize, percentage: u64) -> usize {
        let filled = (bar_width as f64 * percentage as f64 / 100.0).round() as usize;
        filled.min(bar_width)
    }

    pub fn bar(&self, report: &ProgressReport, columns: Option<u16>) -> String {
        let width = self.bar_width(columns);
        let filled = Self::filled_cells(width, report.percentage);
        format!(
            "{}{}",
            self.paint(BAR_CHAR.repeat(filled), |s| s.green()),
            self.paint(BAR_CHAR.repeat(width - filled), |s| s.black().bright()),
        )
    }

    pub fn render(&self, report: &ProgressReport, columns: Option<u16>) -> String {
        format!(
            "{}: {} Frames: {} FPS: {} Speed: {} ETA: {}",
            self.paint(&self.label, |s| s.bold()),
            self.bar(report, columns),
            self.paint(format!("{}/{}", report.frames, report.total_frames), |s| s.blue()),
            self.paint(report.fps, |s| s.green()),
            self.paint(format!("{}x", report.speed), |s| s.magenta()),
            self.paint(report.eta(), |s| s.cyan()),
        )
    }

    fn paint<D: Display>(
        &self,
        value: D,
        apply: impl FnOnce(console::StyledObject<D>) -> console::StyledObject<D>,
    ) -> String {
        apply(style(value)).force_styling(self.color).to_string()
    }
}
