use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::pricing::round_money;

/// `$1,234.56`; negative amounts keep the sign before the symbol.
pub fn money(amount: Decimal, symbol: &str) -> String {
    let rounded = round_money(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}{symbol}{}.{cents}", group_thousands(whole))
}

/// Quantity without trailing zeros, grouped: `11,600`, `2.5`.
pub fn quantity(value: Decimal) -> String {
    let normalized = value.normalize().to_string();
    match normalized.split_once('.') {
        Some((whole, fraction)) => format!("{}.{fraction}", group_thousands(whole)),
        None => group_thousands(&normalized),
    }
}

/// A fraction as a percentage: `0.08` becomes `8%`, `0.0625` becomes `6.25%`.
pub fn percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

/// `February 20, 2026`.
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}
