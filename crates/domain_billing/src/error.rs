//! Billing domain errors

use thiserror::Error;

use core_kernel::{LockTimeout, MoneyError, PortError};
use domain_clinical::ClinicalError;
use domain_inventory::StockError;

use crate::invoice::InvoiceStatus;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// The consultation already has an invoice
    #[error("Consultation {consultation_id} is already invoiced by {invoice_id}")]
    DuplicateInvoice {
        consultation_id: String,
        invoice_id: String,
    },

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Content edit attempted on an invoice that is no longer pending
    #[error("Invoice {invoice_id} is {status} and can no longer be edited")]
    InvoiceNotEditable {
        invoice_id: String,
        status: InvoiceStatus,
    },

    /// Payment attempted on an invoice that is not pending or overdue
    #[error("Invoice {invoice_id} is {status} and cannot accept a payment")]
    InvoiceNotPayable {
        invoice_id: String,
        status: InvoiceStatus,
    },

    /// Invalid state transition attempted
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStatusTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// Cancelled consultations are never invoiced
    #[error("Consultation {0} is cancelled")]
    ConsultationCancelled(String),

    /// A line item is malformed
    #[error("Invalid line item: {0}")]
    InvalidLineItem(String),

    /// Payment amount rejected
    #[error("Invalid payment amount: {0}")]
    InvalidPaymentAmount(String),

    /// Billing configuration rejected
    #[error("Invalid billing configuration: {0}")]
    Configuration(String),

    /// Reference data lookup failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] PortError),

    #[error(transparent)]
    Clinical(#[from] ClinicalError),

    #[error(transparent)]
    Stock(#[from] StockError),

    /// Calculation error
    #[error("Calculation error: {0}")]
    Money(#[from] MoneyError),

    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),
}
