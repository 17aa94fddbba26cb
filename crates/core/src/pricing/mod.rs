pub mod schedule;
pub mod tax;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub use schedule::PaymentSchedule;

/// Decimal places kept on every monetary figure of a calculation.
pub const MONEY_SCALE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Display unit for the quantity column, e.g. `SF` or `scans`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self { description: description.into(), quantity, unit_price, unit: None }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Exact `quantity * unit_price`, `None` when it does not fit a `Decimal`.
    /// Rounding only happens on the subtotal.
    pub fn extended_amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingCalculation {
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl PricingCalculation {
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

pub trait PricingEngine: Send + Sync {
    fn compute(
        &self,
        line_items: &[LineItem],
        tax_rate: Decimal,
    ) -> Result<PricingCalculation, DomainError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PricingCalculator;

impl PricingEngine for PricingCalculator {
    fn compute(
        &self,
        line_items: &[LineItem],
        tax_rate: Decimal,
    ) -> Result<PricingCalculation, DomainError> {
        compute(line_items, tax_rate)
    }
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn compute(line_items: &[LineItem], tax_rate: Decimal) -> Result<PricingCalculation, DomainError> {
    validate_tax_rate(tax_rate)?;
    let mut sum = Decimal::ZERO;
    for (index, item) in line_items.iter().enumerate() {
        if item.quantity.is_sign_negative() && !item.quantity.is_zero() {
            return Err(DomainError::invalid_input(format!(
                "line item {index} (`{}`) has a negative quantity",
                item.description
            )));
        }
        if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
            return Err(DomainError::invalid_input(format!(
                "line item {index} (`{}`) has a negative unit price",
                item.description
            )));
        }
        sum = item
            .extended_amount()
            .and_then(|amount| sum.checked_add(amount))
            .ok_or_else(|| {
                DomainError::invalid_input(format!(
                    "line item {index} (`{}`) amount overflows",
                    item.description
                ))
            })?;
    }

    let overflow = || DomainError::invalid_input("proposal total overflows");
    let subtotal = round_money(sum);
    let tax = round_money(subtotal.checked_mul(tax_rate).ok_or_else(overflow)?);
    let total = subtotal.checked_add(tax).ok_or_else(overflow)?;

    Ok(PricingCalculation { line_items: line_items.to_vec(), subtotal, tax_rate, tax, total })
}

fn validate_tax_rate(tax_rate: Decimal) -> Result<(), DomainError> {
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
        return Err(DomainError::invalid_input(format!(
            "tax rate {tax_rate} must be a fraction between 0 and 1"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::{compute, LineItem, PricingCalculator, PricingEngine};
    use crate::errors::DomainError;

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn duct_cleaning_scenario_totals() {
        let items = vec![
            LineItem::new("Duct cleaning", Decimal::ONE, money(45_000)),
            LineItem::new("Vent sealing", Decimal::from(3), money(6_000)),
        ];

        let pricing = PricingCalculator.compute(&items, Decimal::new(8, 2)).expect("valid input");

        assert_eq!(pricing.subtotal, money(63_000));
        assert_eq!(pricing.tax, money(5_040));
        assert_eq!(pricing.total, money(68_040));
        assert_eq!(pricing.line_items, items);
    }

    #[test]
    fn empty_line_items_yield_zero_totals() {
        let pricing = compute(&[], Decimal::new(8, 2)).expect("empty is allowed");
        assert!(pricing.is_empty());
        assert_eq!(pricing.subtotal, Decimal::ZERO);
        assert_eq!(pricing.tax, Decimal::ZERO);
        assert_eq!(pricing.total, Decimal::ZERO);
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let error = compute(
            &[LineItem::new("Refund", Decimal::from(-1), money(1_000))],
            Decimal::ZERO,
        )
        .expect_err("negative quantity");
        assert!(matches!(error, DomainError::InvalidInput(ref message) if message.contains("quantity")));
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let error = compute(&[LineItem::new("Credit", Decimal::ONE, money(-500))], Decimal::ZERO)
            .expect_err("negative price");
        assert!(matches!(error, DomainError::InvalidInput(ref message) if message.contains("unit price")));
    }

    #[test]
    fn tax_rate_outside_unit_interval_is_rejected() {
        assert!(compute(&[], Decimal::from(8)).is_err());
        assert!(compute(&[], Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn rounding_happens_once_on_the_subtotal() {
        // 3 x 0.335 = 1.005 exactly; rounding per line and then summing would drift.
        let items = vec![
            LineItem::new("Sealant", Decimal::from(3), Decimal::new(335, 3)),
            LineItem::new("Sealant", Decimal::from(3), Decimal::new(335, 3)),
        ];
        let pricing = compute(&items, Decimal::ZERO).expect("valid");
        assert_eq!(pricing.subtotal, money(201));
    }

    #[test]
    fn overflowing_line_amount_is_rejected() {
        let error = compute(&[LineItem::new("Bulk", Decimal::MAX, Decimal::from(2))], Decimal::ZERO)
            .expect_err("overflow");
        assert!(matches!(error, DomainError::InvalidInput(ref message) if message.contains("overflows")));
    }

    #[test]
    fn overflowing_subtotal_is_rejected() {
        let items = vec![
            LineItem::new("Bulk", Decimal::ONE, Decimal::MAX),
            LineItem::new("Bulk", Decimal::ONE, Decimal::MAX),
        ];
        let error = compute(&items, Decimal::ZERO).expect_err("overflow");
        assert!(matches!(error, DomainError::InvalidInput(ref message) if message.contains("line item 1")));
    }

    fn line_item() -> impl Strategy<Value = LineItem> {
        (0i64..1_000_000, 0u32..4, 0i64..100_000_000, 0u32..4).prop_map(
            |(quantity, quantity_scale, price, price_scale)| {
                LineItem::new(
                    "Item",
                    Decimal::new(quantity, quantity_scale),
                    Decimal::new(price, price_scale),
                )
            },
        )
    }

    proptest! {
        #[test]
        fn subtotal_plus_tax_equals_total(
            items in prop::collection::vec(line_item(), 0..12),
            rate_bp in 0i64..=100_000,
        ) {
            let rate = Decimal::new(rate_bp, 5);
            let pricing = compute(&items, rate).expect("non-negative input is valid");

            prop_assert_eq!(pricing.subtotal + pricing.tax, pricing.total);
            prop_assert!(pricing.subtotal.scale() <= 2);
            prop_assert!(pricing.tax.scale() <= 2);
            prop_assert!(pricing.total >= pricing.subtotal);
        }
    }

    #[test]
    fn identical_inputs_are_deterministic() {
        let items = vec![LineItem::new("Scan", Decimal::new(25, 1), Decimal::new(19_999, 3))];
        let first = compute(&items, Decimal::new(7, 2)).expect("valid");
        let second = compute(&items, Decimal::new(7, 2)).expect("valid");
        assert_eq!(first, second);
    }
}
