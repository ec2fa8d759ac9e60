//! Live progress for a running ffmpeg, reconstructed from its log output.
//!
//! ffmpeg prints the input duration and the stream frame rate once, near the
//! start, and then a `frame=... fps=... speed=...x` report every so often.
//! The monitor picks the first duration and frame rate it can find (or takes
//! them from the command line up front), derives the total frame count, and
//! turns every later report into one status line.
//!
//! Chunks are matched as they arrive, without reassembling lines. Anything
//! that doesn't match is ignored.

use log::{debug, trace};
use regex::Regex;
use std::io::{self, Read};
use std::sync::LazyLock;

use crate::display::DisplaySink;
use crate::prescan::Seeds;
use crate::render::{ProgressReport, Renderer};
use crate::timecode::to_seconds;

static OVERWRITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"File .+ already exists\. Overwrite\? \[y/N\]").expect("invalid overwrite regex")
});
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: *(\d\d:\d\d:\d\d\.\d\d)").expect("invalid duration regex")
});
static STREAM_FPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}\.\d{2}|\d{2}) fps").expect("invalid stream fps regex"));
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)frame= *(\d+) *fps= *(\d+).*speed=(\d+|\d+\.\d+)x")
        .expect("invalid progress regex")
});

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// One `frame= ... fps= ... speed=...x` report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub frames: u64,
    pub fps: f64,
    pub speed: f64,
}

impl ProgressSample {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = PROGRESS_RE.captures(text)?;
        Some(Self {
            frames: caps[1].parse().ok()?,
            fps: caps[2].parse().ok()?,
            speed: caps[3].parse().ok()?,
        })
    }
}

/// How much the monitor knows about the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Still waiting for a duration, a frame rate, or both.
    SeekingMetadata {
        stream_fps: Option<f64>,
        duration: Option<f64>,
    },
    /// Everything needed for a status line is known. Final.
    Ready {
        stream_fps: f64,
        duration: f64,
        total_frames: f64,
    },
}

/// Per-run state. Each value is set at most once; the first one seen wins.
#[derive(Debug, Clone)]
pub struct MonitorState {
    phase: Phase,
    last_rendered_line: String,
}

impl MonitorState {
    pub fn new(stream_fps: Option<f64>, duration: Option<f64>) -> Self {
        let mut state = Self {
            phase: Phase::SeekingMetadata {
                stream_fps: stream_fps.filter(|fps| fps.is_finite() && *fps > 0.0),
                duration: duration.filter(|d| d.is_finite() && *d >= 0.0),
            },
            last_rendered_line: String::new(),
        };
        state.advance();
        state
    }

    pub fn from_seeds(seeds: &Seeds) -> Self {
        let duration = seeds.duration.as_deref().and_then(to_seconds);
        Self::new(seeds.frame_rate, duration)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready { .. })
    }

    pub fn stream_fps(&self) -> Option<f64> {
        match self.phase {
            Phase::SeekingMetadata { stream_fps, .. } => stream_fps,
            Phase::Ready { stream_fps, .. } => Some(stream_fps),
        }
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        match self.phase {
            Phase::SeekingMetadata { duration, .. } => duration,
            Phase::Ready { duration, .. } => Some(duration),
        }
    }

    pub fn total_frames(&self) -> Option<f64> {
        match self.phase {
            Phase::SeekingMetadata { .. } => None,
            Phase::Ready { total_frames, .. } => Some(total_frames),
        }
    }

    pub fn last_rendered_line(&self) -> &str {
        &self.last_rendered_line
    }

    /// Fill whatever is still unknown from `text`.
    pub fn observe(&mut self, text: &str) {
        let Phase::SeekingMetadata { stream_fps, duration } = &mut self.phase else {
            return;
        };

        if duration.is_none() {
            if let Some(caps) = DURATION_RE.captures(text) {
                *duration = to_seconds(&caps[1]);
                debug!("duration from stream: {} -> {:?}s", &caps[1], duration);
            }
        }

        if stream_fps.is_none() {
            if let Some(caps) = STREAM_FPS_RE.captures(text) {
                *stream_fps = caps[1].parse::<f64>().ok().filter(|fps| *fps > 0.0);
                debug!("frame rate from stream: {:?}", stream_fps);
            }
        }

        self.advance();
    }

    fn advance(&mut self) {
        if let Phase::SeekingMetadata {
            stream_fps: Some(stream_fps),
            duration: Some(duration),
        } = self.phase
        {
            let total_frames = duration * stream_fps;
            if total_frames > 0.0 {
                debug!(
                    "ready: {}s at {} fps = {} frames",
                    duration, stream_fps, total_frames
                );
                self.phase = Phase::Ready {
                    stream_fps,
                    duration,
                    total_frames,
                };
            }
        }
    }
}

/// What a chunk turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// An overwrite question was passed on; nothing else was looked at.
    Prompt(String),
    /// A status line was drawn.
    Rendered(ProgressReport),
    /// Nothing to show (metadata may still have been picked up).
    Skipped,
}

/// Turns chunks of ffmpeg's log into status lines and prompts on a display.
pub struct ProgressMonitor<D: DisplaySink> {
    state: MonitorState,
    renderer: Renderer,
    display: D,
}

impl<D: DisplaySink> ProgressMonitor<D> {
    pub fn new(seeds: &Seeds, renderer: Renderer, display: D) -> Self {
        Self {
            state: MonitorState::from_seeds(seeds),
            renderer,
            display,
        }
    }

    /// Seed from the ffmpeg argument list.
    pub fn from_args<S: AsRef<str>>(tokens: &[S], renderer: Renderer, display: D) -> Self {
        Self::new(&Seeds::from_args(tokens), renderer, display)
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn process_chunk(&mut self, chunk: &[u8]) -> ChunkOutcome {
        let text = String::from_utf8_lossy(chunk);
        trace!("chunk: {:?}", text);

        if let Some(m) = OVERWRITE_RE.find(&text) {
            let prompt = m.as_str().trim().to_string();
            self.display.prompt(&prompt);
            return ChunkOutcome::Prompt(prompt);
        }

        self.state.observe(&text);

        let Phase::Ready {
            stream_fps,
            total_frames,
            ..
        } = self.state.phase
        else {
            return ChunkOutcome::Skipped;
        };
        let Some(sample) = ProgressSample::parse(&text) else {
            return ChunkOutcome::Skipped;
        };

        let report = ProgressReport::new(&sample, total_frames, stream_fps);
        let line = self.renderer.render(&report, self.display.columns());
        self.display.update(&line);
        self.state.last_rendered_line = line;
        ChunkOutcome::Rendered(report)
    }

    /// Commit the last line and hand the display back.
    pub fn finish(mut self) -> D {
        self.display.finish();
        self.display
    }

    pub fn run<I, B>(mut self, chunks: I) -> D
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        for chunk in chunks {
            self.process_chunk(chunk.as_ref());
        }
        self.finish()
    }
}

/// Monitor `chunks` until they run out.
pub fn run<I, B, D>(chunks: I, seeds: &Seeds, renderer: Renderer, display: D) -> D
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
    D: DisplaySink,
{
    ProgressMonitor::new(seeds, renderer, display).run(chunks)
}

/// Monitor a pipe until EOF. Read errors end monitoring (the display is
/// still finalized) and are returned to the caller.
pub fn run_reader<R: Read, D: DisplaySink>(mut reader: R, mut monitor: ProgressMonitor<D>) -> io::Result<D> {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                monitor.process_chunk(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                monitor.finish();
                return Err(e);
            }
        }
    }
    Ok(monitor.finish())
}
