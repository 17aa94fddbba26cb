use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::pricing::{round_money, PricingCalculation};

/// Deposit due on execution and the balance due on completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub deposit_percent: Decimal,
    pub deposit: Decimal,
    pub balance: Decimal,
}

impl PaymentSchedule {
    /// `deposit_percent` is expressed in percent (50 means half).
    pub fn for_pricing(
        pricing: &PricingCalculation,
        deposit_percent: Decimal,
    ) -> Result<Self, DomainError> {
        if deposit_percent <= Decimal::ZERO || deposit_percent > Decimal::ONE_HUNDRED {
            return Err(DomainError::invalid_input(format!(
                "deposit percent {deposit_percent} must be in the range (0, 100]"
            )));
        }

        let deposit = round_money(pricing.total * deposit_percent / Decimal::ONE_HUNDRED);
        Ok(Self { deposit_percent, deposit, balance: pricing.total - deposit })
    }
}
