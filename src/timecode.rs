//! Time values shared by the argument scanner and the progress monitor.

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A value that can be read as a number of seconds.
///
/// Plain numbers are already seconds. Strings are colon-separated
/// timecodes (`"83.5"`, `"01:23.5"`, `"00:01:23.50"`, `"1:00:00:00"`).
pub trait ToSeconds {
    fn to_seconds(&self) -> Option<f64>;
}

impl ToSeconds for f64 {
    fn to_seconds(&self) -> Option<f64> {
        Some(*self)
    }
}

impl ToSeconds for str {
    fn to_seconds(&self) -> Option<f64> {
        if self.trim().is_empty() {
            return None;
        }
        // Least-significant field first, each one worth 60x the previous.
        self.split(':')
            .rev()
            .enumerate()
            .try_fold(0.0, |acc, (i, field)| {
                let value = field.trim().parse::<f64>().ok()?;
                Some(acc + value * 60f64.powi(i as i32))
            })
    }
}

impl ToSeconds for String {
    fn to_seconds(&self) -> Option<f64> {
        self.as_str().to_seconds()
    }
}

/// Convert a timecode or a plain seconds value to seconds.
///
/// Returns `None` when any field is not a number.
pub fn to_seconds<T: ToSeconds + ?Sized>(value: &T) -> Option<f64> {
    value.to_seconds()
}

/// Format seconds as a clock reading `HH:MM:SS.mmm`.
///
/// The value is treated as an offset from midnight, so anything past a day
/// wraps around and negative offsets count back from `24:00:00.000`.
/// Sub-millisecond precision is truncated.
pub fn format_clock(seconds: f64) -> String {
    let millis = if seconds.is_finite() {
        (seconds * 1000.0).trunc() as i64
    } else {
        0
    };
    let of_day = millis.rem_euclid(MILLIS_PER_DAY);

    let hours = of_day / 3_600_000;
    let minutes = of_day / 60_000 % 60;
    let secs = of_day / 1000 % 60;
    let ms = of_day % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}
