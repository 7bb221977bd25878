//! Value Formatter shared by axis ticks, data labels, table cells and metric cards.

use crate::models::chart::ValueFormat;

/// Formats `value` for display.
///
/// * `Auto` / `Number`: en-US digit grouping with at most three fraction digits.
/// * `Currency`: whole US dollars, e.g. `$1,200` or `-$1,200`.
/// * `Percent`: the value is a fraction, so `0.42` becomes `42%`.
pub fn format_value(value: f64, format: ValueFormat) -> String {
    if !value.is_finite() {
        return String::new();
    }
    match format {
        ValueFormat::Auto | ValueFormat::Number => group_number(value, 3),
        ValueFormat::Currency => {
            let grouped = group_number(value.abs(), 0);
            if value.round() < 0.0 {
                format!("-${}", grouped)
            } else {
                format!("${}", grouped)
            }
        }
        ValueFormat::Percent => format!("{}%", (value * 100.0).round() as i64),
    }
}

/// Renders `value` with thousands separators and up to `max_fraction` decimals, dropping
/// trailing zeros.
pub fn group_number(value: f64, max_fraction: usize) -> String {
    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    let is_zero = grouped.chars().all(|c| c == '0' || c == '.' || c == ',');
    if value < 0.0 && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Formats `part` as a rounded percentage of `whole`, e.g. 1 of 3 as `33%`.
pub fn format_share(part: f64, whole: f64) -> String {
    if whole <= 0.0 || !whole.is_finite() {
        return "0%".to_string();
    }
    format!("{}%", (part / whole * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1200.0, ValueFormat::Auto, "1,200")]
    #[case(1234567.891, ValueFormat::Number, "1,234,567.891")]
    #[case(0.12345, ValueFormat::Number, "0.123")]
    #[case(-42.5, ValueFormat::Auto, "-42.5")]
    #[case(100.0, ValueFormat::Number, "100")]
    #[case(1200.0, ValueFormat::Currency, "$1,200")]
    #[case(1199.6, ValueFormat::Currency, "$1,200")]
    #[case(-1200.0, ValueFormat::Currency, "-$1,200")]
    #[case(0.42, ValueFormat::Percent, "42%")]
    #[case(1.0, ValueFormat::Percent, "100%")]
    #[case(-0.0001, ValueFormat::Auto, "0")]
    fn formats_values(#[case] value: f64, #[case] format: ValueFormat, #[case] expected: &str) {
        assert_eq!(format_value(value, format), expected);
    }

    #[test]
    fn non_finite_values_render_empty() {
        assert_eq!(format_value(f64::NAN, ValueFormat::Auto), "");
    }

    #[test]
    fn shares_round_to_whole_percent() {
        assert_eq!(format_share(1.0, 3.0), "33%");
        assert_eq!(format_share(5.0, 0.0), "0%");
    }
}
