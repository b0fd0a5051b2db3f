//! Console formatting of final scores.

/// Formats `value` with `digits` significant digits.
///
/// Magnitudes below `1e-4`, or with as many integer digits as `digits`, use
/// scientific notation (`1.23e-05`, `1e+02`). Otherwise fixed notation is
/// used with trailing zeros removed, keeping at least one fractional digit
/// (`0.159`, `1.0`).
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let digits = digits.max(1);

    // Rounding to the requested digits first fixes the decimal exponent.
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..digits as i32 - 1).contains(&exponent) {
        let decimals = (digits as i32 - 1 - exponent) as usize;
        let fixed = format!("{value:.decimals$}");
        let trimmed = fixed.trim_end_matches('0');
        if trimmed.ends_with('.') {
            format!("{trimmed}0")
        } else {
            trimmed.to_string()
        }
    } else {
        let mantissa = if mantissa.contains('.') {
            mantissa.trim_end_matches('0').trim_end_matches('.')
        } else {
            mantissa
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_notation() {
        assert_eq!(format_significant(0.15904, 3), "0.159");
        assert_eq!(format_significant(0.25, 3), "0.25");
        assert_eq!(format_significant(12.34, 3), "12.3");
        assert_eq!(format_significant(1.0, 3), "1.0");
        assert_eq!(format_significant(0.9996, 3), "1.0");
        assert_eq!(format_significant(0.0, 3), "0.0");
        assert_eq!(format_significant(-0.5, 3), "-0.5");
        assert_eq!(format_significant(0.00012345, 3), "0.000123");
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(format_significant(100.0, 3), "1e+02");
        assert_eq!(format_significant(12345.0, 3), "1.23e+04");
        assert_eq!(format_significant(0.00001234, 3), "1.23e-05");
    }

    #[test]
    fn non_finite() {
        assert_eq!(format_significant(f64::NAN, 3), "nan");
        assert_eq!(format_significant(f64::NEG_INFINITY, 3), "-inf");
    }
}
