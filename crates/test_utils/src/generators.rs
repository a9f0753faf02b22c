//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use core_kernel::{Currency, Money, Rate};
use domain_billing::InvoiceLine;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating unit prices in USD, 0.00 to 9,999.99
pub fn usd_price_strategy() -> impl Strategy<Value = Money> {
    (0i64..1_000_000i64).prop_map(|minor| Money::from_minor(minor, Currency::USD))
}

/// Strategy for generating line quantities
pub fn quantity_strategy() -> impl Strategy<Value = u32> {
    1u32..50u32
}

/// Strategy for generating tax rates between 0% and 30% in 0.25% steps
pub fn tax_rate_strategy() -> impl Strategy<Value = Rate> {
    (0i64..=120i64).prop_map(|quarters| Rate::from_percentage(Decimal::new(quarters * 25, 2)))
}

/// Strategy for generating custom USD invoice lines
pub fn invoice_line_strategy() -> impl Strategy<Value = InvoiceLine> {
    ("[A-Z][a-z]{2,12}", quantity_strategy(), usd_price_strategy())
        .prop_map(|(name, quantity, price)| InvoiceLine::custom(name, quantity, price))
}

/// Strategy for generating a non-empty list of invoice lines
pub fn invoice_lines_strategy() -> impl Strategy<Value = Vec<InvoiceLine>> {
    prop::collection::vec(invoice_line_strategy(), 1..8)
}
