//! Plain-text cut plan format.
//!
//! ```text
//! # Cut plan
//! # segments: 2
//! # target_duration: 12.500000
//! # format: start end
//! 0.000000 9.000000
//! 9.000000 14.000000
//! ```
//!
//! Timestamps carry six fractional digits. Plans produced by
//! [`crate::align`] are already quantized to that precision, so
//! `read_plan(&write_plan(&plan))` reproduces them exactly.

use std::fmt::Write as _;

use bounce_models::{CutPlan, CutSegment};

use crate::error::PlanParseError;
use crate::snap::PLAN_PRECISION_DIGITS;

const TARGET_DURATION_KEY: &str = "target_duration:";

/// Overlap allowed between consecutive segments when reading.
const OVERLAP_TOLERANCE: f64 = 1e-9;

/// Render a plan as text.
pub fn write_plan(plan: &CutPlan) -> String {
    let p = PLAN_PRECISION_DIGITS;
    let mut out = String::with_capacity(64 + plan.len() * 24);

    out.push_str("# Cut plan\n");
    let _ = writeln!(out, "# segments: {}", plan.len());
    if let Some(target) = plan.target_duration {
        let _ = writeln!(out, "# {} {:.*}", TARGET_DURATION_KEY, p, target);
    }
    out.push_str("# format: start end\n");

    for segment in plan {
        let _ = writeln!(out, "{:.*} {:.*}", p, segment.start, p, segment.end);
    }
    out
}

/// Parse a plan written by [`write_plan`] (or by hand).
///
/// Blank lines and `#` comments are ignored, apart from the
/// `# target_duration:` header. Segments must be ordered and must not
/// overlap; gaps between them are allowed.
pub fn read_plan(text: &str) -> Result<CutPlan, PlanParseError> {
    let mut segments: Vec<CutSegment> = Vec::new();
    let mut target_duration = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if let Some(value) = comment.trim().strip_prefix(TARGET_DURATION_KEY) {
                target_duration = Some(parse_target(value.trim())?);
            }
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(PlanParseError::FieldCount {
                line: line_no,
                found: fields.len(),
            });
        }

        let start = parse_field(fields[0], line_no)?;
        let end = parse_field(fields[1], line_no)?;
        if end <= start {
            return Err(PlanParseError::EmptySegment {
                line: line_no,
                start,
                end,
            });
        }
        if let Some(previous) = segments.last() {
            if start < previous.end - OVERLAP_TOLERANCE {
                return Err(PlanParseError::Overlap {
                    line: line_no,
                    start,
                    previous_end: previous.end,
                });
            }
        }

        segments.push(CutSegment::new(start, end));
    }

    Ok(CutPlan::new(segments, target_duration))
}

fn parse_field(value: &str, line: usize) -> Result<f64, PlanParseError> {
    let parsed: f64 = value.parse().map_err(|_| PlanParseError::InvalidNumber {
        line,
        value: value.to_string(),
    })?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(PlanParseError::OutOfRange { line });
    }
    Ok(parsed)
}

fn parse_target(value: &str) -> Result<f64, PlanParseError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(PlanParseError::InvalidTargetDuration(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(pairs: &[(f64, f64)], target: Option<f64>) -> CutPlan {
        CutPlan::new(
            pairs.iter().map(|&(s, e)| CutSegment::new(s, e)).collect(),
            target,
        )
    }

    #[test]
    fn test_write_format() {
        let text = write_plan(&plan(&[(0.0, 9.0), (9.0, 14.25)], Some(12.5)));
        assert_eq!(
            text,
            "# Cut plan\n\
             # segments: 2\n\
             # target_duration: 12.500000\n\
             # format: start end\n\
             0.000000 9.000000\n\
             9.000000 14.250000\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let original = plan(
            &[(0.0, 1.234567), (1.234567, 7.000001), (7.000001, 183.5)],
            Some(180.020408),
        );
        assert_eq!(read_plan(&write_plan(&original)).unwrap(), original);

        let untargeted = plan(&[(0.0, 3.0)], None);
        assert_eq!(read_plan(&write_plan(&untargeted)).unwrap(), untargeted);

        let empty = CutPlan::empty(None);
        assert_eq!(read_plan(&write_plan(&empty)).unwrap(), empty);
    }

    #[test]
    fn test_read_tolerates_whitespace_and_comments() {
        let text = "\n# hand edited\n  0   2.5\n\n2.5\t4\n# trailing\n";
        assert_eq!(read_plan(text).unwrap(), plan(&[(0.0, 2.5), (2.5, 4.0)], None));
    }

    #[test]
    fn test_gaps_allowed() {
        let parsed = read_plan("0 2\n5 6\n").unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(!parsed.is_contiguous(1e-9));
    }

    #[test]
    fn test_read_errors_carry_line() {
        let err = read_plan("0 1\n1 2 3\n").unwrap_err();
        assert_eq!(err, PlanParseError::FieldCount { line: 2, found: 3 });

        let err = read_plan("0 abc\n").unwrap_err();
        assert_eq!(
            err,
            PlanParseError::InvalidNumber {
                line: 1,
                value: "abc".to_string()
            }
        );

        assert_eq!(
            read_plan("# c\n-1 2\n").unwrap_err(),
            PlanParseError::OutOfRange { line: 2 }
        );
        assert_eq!(read_plan("0 inf\n").unwrap_err().line(), Some(1));
        assert!(matches!(
            read_plan("3 3\n").unwrap_err(),
            PlanParseError::EmptySegment { line: 1, .. }
        ));
        assert!(matches!(
            read_plan("0 5\n4 6\n").unwrap_err(),
            PlanParseError::Overlap { line: 2, .. }
        ));
        assert_eq!(
            read_plan("# target_duration: soon\n").unwrap_err(),
            PlanParseError::InvalidTargetDuration("soon".to_string())
        );
    }
}
