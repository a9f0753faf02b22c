//! Billing configuration
//!
//! Tax rate and base fee are read when an invoice is aggregated. An issued
//! invoice keeps the tax rate it was created with.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, Rate};

use crate::error::BillingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub currency: Currency,
    pub tax_rate: Rate,
    /// Charged once on every consultation invoice
    pub base_consultation_fee: Money,
    /// Days between issue and due date
    pub payment_terms_days: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            tax_rate: Rate::from_percentage(dec!(8)),
            base_consultation_fee: Money::new(dec!(100), Currency::USD),
            payment_terms_days: 30,
        }
    }
}

impl BillingConfig {
    /// Checks the configuration is usable for invoicing
    pub fn validate(&self) -> Result<(), BillingError> {
        if self.base_consultation_fee.currency() != self.currency {
            return Err(BillingError::Configuration(format!(
                "base fee is in {} but invoices are in {}",
                self.base_consultation_fee.currency(),
                self.currency
            )));
        }
        if self.base_consultation_fee.is_negative() {
            return Err(BillingError::Configuration(
                "base fee cannot be negative".to_string(),
            ));
        }
        let rate = self.tax_rate.as_percentage();
        if rate < dec!(0) || rate > dec!(100) {
            return Err(BillingError::Configuration(format!(
                "tax rate {} is outside 0-100%",
                self.tax_rate
            )));
        }
        Ok(())
    }
}
