//! Parameter classifier.

use super::range::{leading_number, ReferenceRange};
use crate::models::Alert;

/// Classify a measured value against a parsed range.
///
/// Open bounds are inclusive at the bound (`<200` flags 200 as high, `>40`
/// flags 40 as low) while closed intervals treat both ends as normal.
pub fn classify(value: &str, range: &ReferenceRange) -> Alert {
    let Some(value) = leading_number(value) else {
        return Alert::None;
    };

    match *range {
        ReferenceRange::UpperBound(max) => {
            if value >= max {
                Alert::High
            } else {
                Alert::Normal
            }
        }
        ReferenceRange::LowerBound(min) => {
            if value <= min {
                Alert::Low
            } else {
                Alert::Normal
            }
        }
        ReferenceRange::Interval { min, max } => {
            if value < min {
                Alert::Low
            } else if value > max {
                Alert::High
            } else {
                Alert::Normal
            }
        }
        ReferenceRange::Unparsable => Alert::None,
    }
}

/// Parse `range` and classify `value` against it.
pub fn classify_text(value: &str, range: &str) -> Alert {
    classify(value, &ReferenceRange::parse(range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_classification() {
        assert_eq!(classify_text("38", "36-46"), Alert::Normal);
        assert_eq!(classify_text("35.9", "36-46"), Alert::Low);
        assert_eq!(classify_text("46.1", "36-46"), Alert::High);
    }

    #[test]
    fn test_interval_bounds_are_normal() {
        assert_eq!(classify_text("36", "36-46"), Alert::Normal);
        assert_eq!(classify_text("46", "36-46"), Alert::Normal);
    }

    #[test]
    fn test_upper_bound_inclusive() {
        assert_eq!(classify_text("200", "<200"), Alert::High);
        assert_eq!(classify_text("199.9", "<200"), Alert::Normal);
        assert_eq!(classify_text("250", "<200"), Alert::High);
    }

    #[test]
    fn test_lower_bound_inclusive() {
        assert_eq!(classify_text("39", ">40"), Alert::Low);
        assert_eq!(classify_text("40", ">40"), Alert::Low);
        assert_eq!(classify_text("41", ">40"), Alert::Normal);
    }

    #[test]
    fn test_no_classification() {
        assert_eq!(classify_text("", "36-46"), Alert::None);
        assert_eq!(classify_text("   ", "<200"), Alert::None);
        assert_eq!(classify_text("positive", "36-46"), Alert::None);
        assert_eq!(classify_text("38", ""), Alert::None);
        assert_eq!(classify_text("38", "see comment"), Alert::None);
    }

    #[test]
    fn test_half_open_interval_only_checks_known_side() {
        assert_eq!(classify_text("5", "10-"), Alert::Low);
        assert_eq!(classify_text("5000", "10-"), Alert::Normal);
    }
}
