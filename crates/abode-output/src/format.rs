//! Number formatting.

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Whole-dollar amount with thousands separators, e.g. `$1,234,567`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }
    let dollars = amount.abs().round() as u64;
    let digits = dollars.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if amount < 0.0 && dollars > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "$0")]
    #[case(999.4, "$999")]
    #[case(1_000.0, "$1,000")]
    #[case(1_234_567.49, "$1,234,567")]
    #[case(1_234_567.5, "$1,234,568")]
    #[case(45_000_000.0, "$45,000,000")]
    #[case(-2_500.0, "-$2,500")]
    fn test_format_currency(#[case] amount: f64, #[case] expected: &str) {
        assert_eq!(format_currency(amount), expected);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1_234_567.891, 2), 1_234_567.89);
        assert_eq!(round_to(0.673_449, 4), 0.6734);
        assert_eq!(round_to(812_345.6, 0), 812_346.0);
    }
}
