//! Opaque version-id ordering and range matching.
//!
//! Version ids are opaque strings; the engine never assumes a scheme. This
//! module provides the stock interpretation used by the default comparator
//! and the stock match rules:
//! - Ids are split into segments on `.` and `-`
//! - Numeric segments compare as numbers
//! - Text segments compare case-insensitively, and sort below numbers
//! - Trailing zero segments are insignificant (`1.0` == `1.0.0`)

use std::cmp::Ordering;
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Error raised when a version range expression cannot be parsed.
#[derive(Debug, Error, Diagnostic)]
pub enum VersionError {
    /// The range expression is not bracketed or has no closing bound.
    #[error("malformed version range: {spec:?}")]
    #[diagnostic(help("ranges look like [1.0,2.0), [1.0,], (,2.0] or [1.0]"))]
    MalformedRange { spec: String },
}

/// Total order over opaque version ids.
///
/// Injected into the engine; selection prefers versions ranked higher by
/// this order.
pub trait VersionOrder: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// The stock comparator: segment-wise numeric/text ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentOrder;

impl VersionOrder for SegmentOrder {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        SegmentedVersion::parse(a).cmp(&SegmentedVersion::parse(b))
    }
}

/// A version id parsed into comparable segments.
#[derive(Debug, Clone)]
pub struct SegmentedVersion {
    pub original: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Text(String),
}

impl SegmentedVersion {
    pub fn parse(version: &str) -> Self {
        let segments = version
            .split(['.', '-'])
            .filter(|s| !s.is_empty())
            .map(|token| match token.parse::<u64>() {
                Ok(n) => Segment::Numeric(n),
                Err(_) => Segment::Text(token.to_lowercase()),
            })
            .collect();
        Self {
            original: version.to_string(),
            segments,
        }
    }
}

impl fmt::Display for SegmentedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for SegmentedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SegmentedVersion {}

impl Ord for SegmentedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let ord = compare_segments(self.segments.get(i), other.segments.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for SegmentedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        // trailing zeros do not distinguish versions
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        // a trailing qualifier sorts below the bare version
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
    }
}

/// A version range expression over segmented versions.
///
/// Supports `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, and `[1.0]` (exact).
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: SegmentedVersion,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse a bracketed range expression.
    pub fn parse(spec: &str) -> Result<Self, VersionError> {
        let s = spec.trim();
        let malformed = || VersionError::MalformedRange {
            spec: spec.to_string(),
        };
        if s.len() < 3
            || !(s.starts_with('[') || s.starts_with('('))
            || !(s.ends_with(']') || s.ends_with(')'))
        {
            return Err(malformed());
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        if let Some((lower, upper)) = inner.split_once(',') {
            let lower = lower.trim();
            let upper = upper.trim();
            Ok(VersionRange {
                lower: (!lower.is_empty()).then(|| Bound {
                    version: SegmentedVersion::parse(lower),
                    inclusive: open_inclusive,
                }),
                upper: (!upper.is_empty()).then(|| Bound {
                    version: SegmentedVersion::parse(upper),
                    inclusive: close_inclusive,
                }),
            })
        } else {
            // exact form: [1.0] means exactly 1.0
            if inner.trim().is_empty() || !open_inclusive || !close_inclusive {
                return Err(malformed());
            }
            let v = SegmentedVersion::parse(inner.trim());
            Ok(VersionRange {
                lower: Some(Bound {
                    version: v.clone(),
                    inclusive: true,
                }),
                upper: Some(Bound {
                    version: v,
                    inclusive: true,
                }),
            })
        }
    }

    /// Check whether a version falls inside this range.
    pub fn contains(&self, version: &SegmentedVersion) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }
}
