//! Billing Domain - Charge Aggregation, Invoicing and Payments
//!
//! This crate turns a consultation's clinical records into a priced invoice
//! and follows that invoice until it is paid.
//!
//! # Flow
//!
//! 1. [`ChargeAggregator`] collects the billable lines of a consultation:
//!    base fee, performed cares, consumed supplies, prescription items and
//!    custom lines
//! 2. [`InvoiceLedger`] stores the invoice (one per consultation) and owns
//!    its status: `pending → paid`, `pending → overdue → paid`
//! 3. [`PaymentRecorder`] appends a payment and settles the invoice
//!
//! # Money
//!
//! All arithmetic is decimal. Tax is `subtotal × rate` rounded half away
//! from zero to the currency's minor unit, and `total = subtotal + tax`.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{InvoiceLedger, PaymentRecorder, PaymentRequest, PaymentMethod};
//!
//! let invoice = ledger.create(consultation_id).await?;
//! let payment = payments
//!     .record_payment(PaymentRequest::new(invoice.id, invoice.total, PaymentMethod::Cash, cashier_id))
//!     .await?;
//! ```

pub mod config;
pub mod invoice;
pub mod aggregator;
pub mod ledger;
pub mod payment;
pub mod error;

pub use config::BillingConfig;
pub use invoice::{
    can_edit_invoice, Invoice, InvoiceItem, InvoiceItemKind, InvoiceLine, InvoiceStatus, InvoiceTotals,
};
pub use aggregator::{totals, ChargeAggregator, ChargeSources};
pub use ledger::{ClinicalRecords, InvoiceLedger};
pub use payment::{Payment, PaymentMethod, PaymentRecorder, PaymentRequest};
pub use error::BillingError;
