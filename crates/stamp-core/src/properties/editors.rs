//! Input parsing and descriptors for the individual property editors.

use crate::geometry::clamp;

/// Kind of input control used for a property.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorKind {
    /// Integer input with a unit suffix and an optional range hint.
    Unit {
        unit: &'static str,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Integer percentage in `[0, 100]`.
    Percent,
    /// Colour picker.
    Colour,
    /// Free text.
    Text,
    /// File chooser limited to the given media types.
    File { accept: Vec<String> },
}

impl EditorKind {
    pub fn unit(unit: &'static str) -> Self {
        EditorKind::Unit {
            unit,
            min: None,
            max: None,
        }
    }

    pub fn unit_range(unit: &'static str, min: f64, max: f64) -> Self {
        EditorKind::Unit {
            unit,
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Parse a numeric field the way a number input reports it: leading
/// integer digits only, fractional part dropped.
///
/// Returns `None` when the input does not start with a number.
pub fn parse_unit(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<f64>().ok().map(|value| sign * value)
}

/// Convert a percent input into a `[0, 1]` fraction. Input that does not
/// start with a number reads as 0%.
pub fn parse_percent(input: &str) -> f64 {
    parse_unit(input).map_or(0.0, percent_to_fraction)
}

/// Integer-truncate a percentage, clamp it into `[0, 100]` and scale it
/// down to a fraction.
pub fn percent_to_fraction(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.0;
    }
    clamp(percent.trunc(), 0.0, 100.0).unwrap_or(0.0) / 100.0
}

/// Fraction shown as a whole percentage.
pub fn fraction_to_percent(fraction: f64) -> f64 {
    (fraction * 100.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit() {
        assert_eq!(parse_unit("42"), Some(42.0));
        assert_eq!(parse_unit(" 42.9 "), Some(42.0));
        assert_eq!(parse_unit("-7"), Some(-7.0));
        assert_eq!(parse_unit("12px"), Some(12.0));
        assert_eq!(parse_unit(""), None);
        assert_eq!(parse_unit("abc"), None);
        assert_eq!(parse_unit("-"), None);
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("50"), 0.5);
        assert_eq!(parse_percent("150"), 1.0);
        assert_eq!(parse_percent("-3"), 0.0);
        assert_eq!(parse_percent("33.9"), 0.33);
        assert_eq!(parse_percent("x"), 0.0);
        assert_eq!(parse_percent(""), 0.0);
    }

    #[test]
    fn test_fraction_to_percent() {
        assert_eq!(fraction_to_percent(0.5), 50.0);
        assert_eq!(fraction_to_percent(1.0), 100.0);
    }
}
