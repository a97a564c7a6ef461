use rust_decimal::Decimal;

use crate::constants::CENTS_PER_UNIT;

/// Converts minor units to a decimal amount with two fractional digits.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Renders cents as a dollar string with thousands separators, e.g.
/// `-$1,234.50`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let units = abs / CENTS_PER_UNIT as u64;
    let fraction = abs % CENTS_PER_UNIT as u64;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{:02}", sign, grouped, fraction)
}
