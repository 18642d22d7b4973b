use std::fmt::Display;

use crate::constants::PLACEHOLDER;

// Absent values render as the placeholder glyph, never as zero
pub fn format_opt<T: Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Axis label seconds: whole numbers without a fractional part.
pub fn format_secs(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{:.0}", secs)
    } else {
        format!("{}", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values_use_placeholder() {
        assert_eq!(format_opt(Some(-3i64)), "-3");
        assert_eq!(format_opt(Some(0u64)), "0");
        assert_eq!(format_opt::<u64>(None), "—");
    }

    #[test]
    fn seconds_drop_trailing_zero() {
        assert_eq!(format_secs(2.0), "2");
        assert_eq!(format_secs(0.5), "0.5");
    }
}
