//! US state base sales-tax rates used when a proposal does not carry an
//! explicit tax rate. Local surcharges are not modelled.

use rust_decimal::Decimal;

/// `(state code, mantissa, scale)` so every rate stays an exact decimal.
const STATE_BASE_RATES: &[(&str, i64, u32)] = &[
    ("AK", 0, 0),
    ("AL", 4, 2),
    ("AR", 65, 3),
    ("AZ", 56, 3),
    ("CA", 725, 4),
    ("CO", 29, 3),
    ("CT", 635, 4),
    ("DC", 6, 2),
    ("DE", 0, 0),
    ("FL", 6, 2),
    ("GA", 4, 2),
    ("HI", 4, 2),
    ("IA", 6, 2),
    ("ID", 6, 2),
    ("IL", 625, 4),
    ("IN", 7, 2),
    ("KS", 65, 3),
    ("KY", 6, 2),
    ("LA", 5, 2),
    ("MA", 625, 4),
    ("MD", 6, 2),
    ("ME", 55, 3),
    ("MI", 6, 2),
    ("MN", 6875, 5),
    ("MO", 4225, 5),
    ("MS", 7, 2),
    ("MT", 0, 0),
    ("NC", 475, 4),
    ("ND", 5, 2),
    ("NE", 55, 3),
    ("NH", 0, 0),
    ("NJ", 6625, 5),
    ("NM", 5125, 5),
    ("NV", 685, 4),
    ("NY", 4, 2),
    ("OH", 575, 4),
    ("OK", 45, 3),
    ("OR", 0, 0),
    ("PA", 6, 2),
    ("RI", 7, 2),
    ("SC", 6, 2),
    ("SD", 45, 3),
    ("TN", 7, 2),
    ("TX", 625, 4),
    ("UT", 61, 3),
    ("VA", 53, 3),
    ("VT", 6, 2),
    ("WA", 65, 3),
    ("WI", 5, 2),
    ("WV", 6, 2),
    ("WY", 4, 2),
];

/// Base rate for a two-letter state code (case-insensitive), `None` when unknown.
pub fn state_base_rate(state: &str) -> Option<Decimal> {
    let code = state.trim().to_ascii_uppercase();
    STATE_BASE_RATES
        .binary_search_by(|(candidate, _, _)| (*candidate).cmp(code.as_str()))
        .ok()
        .map(|index| {
            let (_, mantissa, scale) = STATE_BASE_RATES[index];
            Decimal::new(mantissa, scale)
        })
}

/// Explicit rate wins, then the state table, then the configured fallback.
pub fn resolve_tax_rate(explicit: Option<Decimal>, state: Option<&str>, fallback: Decimal) -> Decimal {
    explicit.or_else(|| state.and_then(state_base_rate)).unwrap_or(fallback)
}
