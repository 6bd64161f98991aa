//! Reference range parser.
//!
//! Accepts three textual shapes:
//! - `"<X"`: upper bound only
//! - `">X"`: lower bound only
//! - `"X-Y"`: closed interval
//!
//! Numbers are read as a leading dot-decimal prefix, so trailing units
//! (`"<200 mg/dL"`) are tolerated.

use serde::{Deserialize, Serialize};

/// A parsed reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ReferenceRange {
    /// `<max`
    UpperBound(f64),
    /// `>min`
    LowerBound(f64),
    /// `min-max`. A side that failed to parse is stored as an infinity so it
    /// never triggers an alert.
    Interval { min: f64, max: f64 },
    /// Empty or unreadable text
    Unparsable,
}

impl ReferenceRange {
    /// Parse a textual reference range.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return ReferenceRange::Unparsable;
        }

        if let Some(rest) = text.strip_prefix('<') {
            return leading_number(rest)
                .map(ReferenceRange::UpperBound)
                .unwrap_or(ReferenceRange::Unparsable);
        }

        if let Some(rest) = text.strip_prefix('>') {
            return leading_number(rest)
                .map(ReferenceRange::LowerBound)
                .unwrap_or(ReferenceRange::Unparsable);
        }

        let Some((low, high)) = text.split_once('-') else {
            return ReferenceRange::Unparsable;
        };

        match (leading_number(low), leading_number(high)) {
            (None, None) => ReferenceRange::Unparsable,
            (min, max) => ReferenceRange::Interval {
                min: min.unwrap_or(f64::NEG_INFINITY),
                max: max.unwrap_or(f64::INFINITY),
            },
        }
    }

    pub fn is_parsable(&self) -> bool {
        !matches!(self, ReferenceRange::Unparsable)
    }
}

/// Read the longest dot-decimal number at the start of `text`.
///
/// Leading whitespace is skipped; anything after the number is ignored.
pub fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when digits follow it.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok()
}
