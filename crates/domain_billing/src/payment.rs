//! Payment recording
//!
//! A payment is an append-only event. Recording one settles the invoice it
//! references; there is no update or delete. Corrections happen outside
//! this core.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use core_kernel::{InvoiceId, Money, PaymentId, StaffId};

use crate::error::BillingError;
use crate::invoice::InvoiceStatus;
use crate::ledger::InvoiceLedger;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Check,
    Insurance,
    MobileMoney,
}

/// A recorded payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// External reference (card slip, transfer id)
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub cashier_id: StaffId,
    pub recorded_at: DateTime<Utc>,
}

/// A payment to record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub cashier_id: StaffId,
}

impl PaymentRequest {
    pub fn new(invoice_id: InvoiceId, amount: Money, method: PaymentMethod, cashier_id: StaffId) -> Self {
        Self {
            invoice_id,
            amount,
            method,
            reference: None,
            notes: None,
            cashier_id,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Records payments and settles invoices
pub struct PaymentRecorder {
    invoices: Arc<InvoiceLedger>,
    payments: RwLock<Vec<Payment>>,
}

impl PaymentRecorder {
    pub fn new(invoices: Arc<InvoiceLedger>) -> Self {
        Self {
            invoices,
            payments: RwLock::new(Vec::new()),
        }
    }

    /// Records a payment against a pending or overdue invoice.
    ///
    /// The invoice's lock is held from the payability check until the
    /// payment is appended, so of two concurrent payments only the first
    /// succeeds; the second sees a paid invoice and fails with
    /// `InvoiceNotPayable`.
    ///
    /// Partial payments are accepted and still settle the invoice.
    #[instrument(skip(self, request), fields(invoice_id = %request.invoice_id, method = ?request.method))]
    pub async fn record_payment(&self, request: PaymentRequest) -> Result<Payment, BillingError> {
        let mut invoice = self.invoices.lock_invoice(request.invoice_id).await?;

        if !invoice.status.is_payable() {
            return Err(BillingError::InvoiceNotPayable {
                invoice_id: invoice.id.to_string(),
                status: invoice.status,
            });
        }
        if request.amount.currency() != invoice.currency {
            return Err(BillingError::InvalidPaymentAmount(format!(
                "payment in {} for an invoice in {}",
                request.amount.currency(),
                invoice.currency
            )));
        }
        if !request.amount.is_positive() {
            return Err(BillingError::InvalidPaymentAmount(format!(
                "{} is not a positive amount",
                request.amount
            )));
        }

        let payment = Payment {
            id: PaymentId::new_v7(),
            invoice_id: invoice.id,
            amount: request.amount,
            method: request.method,
            reference: request.reference,
            notes: request.notes,
            cashier_id: request.cashier_id,
            recorded_at: Utc::now(),
        };

        invoice.transition_to(InvoiceStatus::Paid)?;
        invoice.paid_at = Some(payment.recorded_at);
        invoice.payment_method = Some(payment.method);
        invoice.payment_reference = payment.reference.clone();
        invoice.cashier_id = Some(payment.cashier_id);

        self.payments.write().await.push(payment.clone());

        if payment.amount.amount() < invoice.total.amount() {
            warn!(paid = %payment.amount, total = %invoice.total, "Invoice settled by a partial payment");
        }
        info!(payment_id = %payment.id, amount = %payment.amount, "Payment recorded");
        Ok(payment)
    }

    /// Payments recorded against an invoice, oldest first
    pub async fn payments_for(&self, invoice_id: InvoiceId) -> Vec<Payment> {
        self.payments
            .read()
            .await
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .collect()
    }

    pub async fn list(&self) -> Vec<Payment> {
        self.payments.read().await.clone()
    }
}
