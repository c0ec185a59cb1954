//! Timestamp list files exchanged between the beat source and the measure stage.
//!
//! Format:
//!
//! ```text
//! # Beat timestamps for: song.mp3
//! # Detected 412 beats at 128.0 BPM
//! # Format: beat_number, timestamp_seconds
//! #
//! 1, 0.185760
//! 2, 0.650159
//! ```
//!
//! Comment and blank lines are skipped. Malformed data lines are skipped and
//! logged at debug level.

use tracing::debug;

/// Timestamps read from a list file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimestampList {
    /// Timestamps in file order, seconds
    pub timestamps: Vec<f64>,
    /// Tempo announced in a header comment (`... at <bpm> BPM`)
    pub tempo_bpm: Option<f64>,
}

/// Parse a timestamp list.
pub fn parse_timestamp_list(text: &str) -> TimestampList {
    let mut list = TimestampList::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if list.tempo_bpm.is_none() {
                list.tempo_bpm = parse_header_tempo(comment);
            }
            continue;
        }

        match parse_data_line(line) {
            Some(ts) => list.timestamps.push(ts),
            None => debug!(line = idx + 1, content = line, "Skipping malformed timestamp line"),
        }
    }

    list
}

/// `index, seconds` or a bare `seconds` value.
fn parse_data_line(line: &str) -> Option<f64> {
    let field = match line.split_once(',') {
        Some((_, ts)) => ts,
        None => line,
    };
    let ts: f64 = field.trim().parse().ok()?;
    (ts.is_finite() && ts >= 0.0).then_some(ts)
}

/// Find `<number> BPM` in a header comment.
fn parse_header_tempo(comment: &str) -> Option<f64> {
    let words: Vec<&str> = comment.split_whitespace().collect();
    words.windows(2).find_map(|w| {
        if w[1].eq_ignore_ascii_case("bpm") {
            w[0].parse::<f64>().ok().filter(|bpm| *bpm > 0.0)
        } else {
            None
        }
    })
}

/// Render a timestamp list with the given header comment lines.
///
/// Header lines are written with a `# ` prefix; indices are 1-based and
/// timestamps carry 6 fractional digits.
pub fn write_timestamp_list<S: AsRef<str>>(timestamps: &[f64], header: &[S]) -> String {
    let mut out = String::new();
    for line in header {
        out.push_str("# ");
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out.push_str("# Format: index, timestamp_seconds\n#\n");
    for (i, ts) in timestamps.iter().enumerate() {
        out.push_str(&format!("{}, {:.6}\n", i + 1, ts));
    }
    out
}
