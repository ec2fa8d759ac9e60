//! Frame rate and duration known from the ffmpeg command line, before
//! ffmpeg has printed anything.

use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use crate::timecode::to_seconds;

static FILTER_FPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fps=(\d+)").expect("invalid filter fps regex"));

/// ffmpeg's video rate abbreviations.
const RATE_ABBREVIATIONS: &[(&str, f64)] = &[
    ("ntsc", 30000.0 / 1001.0),
    ("pal", 25.0),
    ("qntsc", 30000.0 / 1001.0),
    ("qpal", 25.0),
    ("sntsc", 30000.0 / 1001.0),
    ("spal", 25.0),
    ("film", 24.0),
    ("ntsc-film", 24000.0 / 1001.0),
];

/// Values recovered from the argument list that seed a progress monitor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seeds {
    /// Output frames per second
    pub frame_rate: Option<f64>,
    /// Duration as given on the command line (timecode or seconds)
    pub duration: Option<String>,
}

impl Seeds {
    pub fn from_args<S: AsRef<str>>(tokens: &[S]) -> Self {
        let seeds = Self {
            frame_rate: scan_frame_rate(tokens),
            duration: scan_duration(tokens),
        };
        debug!(
            "argument seeds: frame_rate={:?} duration={:?}",
            seeds.frame_rate, seeds.duration
        );
        seeds
    }
}

/// Look up the first occurrence of `flag`.
///
/// Outer `None`: the flag is absent. Inner `None`: the flag is there but
/// nothing (or an empty token) follows it.
fn flag_value<'a, S: AsRef<str>>(tokens: &'a [S], flag: &str) -> Option<Option<&'a str>> {
    let idx = tokens.iter().position(|t| t.as_ref() == flag)?;
    Some(
        tokens
            .get(idx + 1)
            .map(|t| t.as_ref())
            .filter(|t| !t.is_empty()),
    )
}

fn filter_graph_rate(graph: Option<&str>) -> Option<Option<String>> {
    let graph = graph?;
    if !graph.contains("fps=") {
        return None;
    }
    Some(
        FILTER_FPS_RE
            .captures(graph)
            .map(|caps| caps[1].to_string()),
    )
}

/// Find the output frame rate implied by the arguments.
///
/// Later rules win when several apply: `-fpsmax`, then `-r`, then an
/// `fps=` clause in `-vf`, then one in `-filter_complex`.
pub fn scan_frame_rate<S: AsRef<str>>(tokens: &[S]) -> Option<f64> {
    let mut raw: Option<String> = None;

    if let Some(value) = flag_value(tokens, "-fpsmax") {
        raw = value.map(str::to_string);
    }
    if let Some(value) = flag_value(tokens, "-r") {
        raw = value.map(str::to_string);
    }
    if let Some(value) = flag_value(tokens, "-vf").and_then(filter_graph_rate) {
        raw = value;
    }
    if let Some(value) = flag_value(tokens, "-filter_complex").and_then(filter_graph_rate) {
        raw = value;
    }

    raw.as_deref().and_then(parse_frame_rate)
}

/// Interpret an ffmpeg frame rate: decimal, `num/den`, or an abbreviation.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();

    if let Ok(rate) = raw.parse::<f64>() {
        return positive(rate);
    }

    if let Some((num, den)) = raw.split_once('/') {
        if let (Ok(num), Ok(den)) = (num.trim().parse::<i64>(), den.trim().parse::<i64>()) {
            return positive(num as f64 / den as f64);
        }
    }

    RATE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, rate)| *rate)
}

fn positive(rate: f64) -> Option<f64> {
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Find the duration of the output implied by the arguments.
///
/// `-t` is returned verbatim. Otherwise `-to` is the duration, minus
/// `-ss` when a start is also given.
pub fn scan_duration<S: AsRef<str>>(tokens: &[S]) -> Option<String> {
    if let Some(value) = flag_value(tokens, "-t") {
        return value.map(str::to_string);
    }

    let end = flag_value(tokens, "-to")??;
    match flag_value(tokens, "-ss").flatten() {
        None => Some(end.to_string()),
        Some(start) => {
            let seconds = to_seconds(end)? - to_seconds(start)?;
            Some(seconds.to_string())
        }
    }
}

/// Whether ffmpeg's stdin has to stay the caller's: an input is read from
/// it (`-i -`, `-i pipe:` or `-i pipe:0`) or `-nostdin` turns off
/// interaction.
pub fn stdin_is_spoken_for<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens.iter().enumerate().any(|(i, token)| match token.as_ref() {
        "-nostdin" => true,
        "-i" => matches!(
            tokens.get(i + 1).map(|next| next.as_ref()),
            Some("-" | "pipe:" | "pipe:0")
        ),
        _ => false,
    })
}
