//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_billing::{Invoice, InvoiceStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that an invoice's totals agree with its items
///
/// Checks that the subtotal is the sum of the line totals, that the total is
/// subtotal plus tax, and that every amount sits on the currency's minor unit.
pub fn assert_invoice_consistent(invoice: &Invoice) {
    let line_sum: Decimal = invoice.items.iter().map(|item| item.total.amount()).sum();
    assert_eq!(
        invoice.subtotal.amount(),
        line_sum,
        "Invoice {} subtotal {} does not match its lines ({})",
        invoice.invoice_number,
        invoice.subtotal,
        line_sum
    );
    assert_eq!(
        invoice.total.amount(),
        invoice.subtotal.amount() + invoice.tax.amount(),
        "Invoice {} total is not subtotal + tax",
        invoice.invoice_number
    );

    let places = invoice.currency.decimal_places();
    for amount in [invoice.subtotal, invoice.tax, invoice.total] {
        assert_eq!(
            amount.amount(),
            amount.amount().round_dp(places),
            "Invoice {} carries sub-minor-unit amount {}",
            invoice.invoice_number,
            amount
        );
    }
}

/// Asserts that an invoice was settled by a payment
pub fn assert_invoice_paid(invoice: &Invoice) {
    assert_eq!(invoice.status, InvoiceStatus::Paid, "Invoice {} is not paid", invoice.invoice_number);
    assert!(invoice.paid_at.is_some(), "Paid invoice {} has no paid_at", invoice.invoice_number);
    assert!(
        invoice.payment_method.is_some(),
        "Paid invoice {} has no payment method",
        invoice.invoice_number
    );
}
