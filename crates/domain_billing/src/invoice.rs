//! Invoices
//!
//! An invoice is the priced artifact of one consultation. Its items are a
//! private copy of the charges: once issued, nothing in the catalog can
//! change what it bills.
//!
//! Status lifecycle:
//!
//! ```text
//! pending ──► paid
//!    │         ▲
//!    └─► overdue
//! ```
//!
//! `paid` is terminal and nothing returns to `pending`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{
    ConsultationId, Currency, InvoiceId, InvoiceItemId, Money, PatientId, PrescriptionId, Rate,
    StaffId, UserRole,
};

use crate::error::BillingError;
use crate::payment::PaymentMethod;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued, awaiting payment
    Pending,
    /// Settled
    Paid,
    /// Past due date without payment
    Overdue,
}

impl InvoiceStatus {
    /// Pending and overdue invoices accept a payment
    pub fn is_payable(&self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::Overdue)
    }

    pub fn can_transition_to(&self, target: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) |
            (Pending, Overdue) |
            (Overdue, Paid)
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        };
        f.write_str(name)
    }
}

/// Where an invoice line comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceItemKind {
    ConsultationFee,
    Care,
    Supply,
    Medication,
    Exam,
    #[default]
    Custom,
}

/// A priced invoice line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub kind: InvoiceItemKind,
    /// Identifier of the record this line was built from, if any
    pub source_ref: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

impl InvoiceItem {
    /// Creates a line, computing `total = quantity × unit_price`
    pub fn new(
        kind: InvoiceItemKind,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, BillingError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BillingError::InvalidLineItem("item name is empty".to_string()));
        }
        if quantity == 0 {
            return Err(BillingError::InvalidLineItem(format!(
                "{name}: quantity must be greater than zero"
            )));
        }
        if unit_price.is_negative() {
            return Err(BillingError::InvalidLineItem(format!(
                "{name}: unit price cannot be negative"
            )));
        }
        Ok(Self {
            id: InvoiceItemId::new_v7(),
            kind,
            source_ref: None,
            name,
            description: None,
            quantity,
            unit_price,
            total: unit_price.times(quantity)?,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_source(mut self, source: impl fmt::Display) -> Self {
        self.source_ref = Some(source.to_string());
        self
    }
}

/// A caller-supplied line: a custom charge, or a line of an edited invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    #[serde(default)]
    pub kind: InvoiceItemKind,
    #[serde(default)]
    pub source_ref: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl InvoiceLine {
    /// A custom charge
    pub fn custom(name: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            kind: InvoiceItemKind::Custom,
            source_ref: None,
            name: name.into(),
            description: None,
            quantity,
            unit_price,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Prices the line in `currency`
    pub fn into_item(self, currency: Currency) -> Result<InvoiceItem, BillingError> {
        if self.unit_price.currency() != currency {
            return Err(BillingError::InvalidLineItem(format!(
                "{}: priced in {} but the invoice is in {}",
                self.name,
                self.unit_price.currency(),
                currency
            )));
        }
        let mut item = InvoiceItem::new(self.kind, self.name, self.quantity, self.unit_price)?;
        item.description = self.description;
        item.source_ref = self.source_ref;
        Ok(item)
    }
}

impl From<&InvoiceItem> for InvoiceLine {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            kind: item.kind,
            source_ref: item.source_ref.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Subtotal, tax and total of a list of items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// An invoice for one consultation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-readable number, e.g. `INV-2024-000042`
    pub invoice_number: String,
    pub patient_id: PatientId,
    pub consultation_id: ConsultationId,
    /// Prescription whose items were billed, if any
    pub prescription_id: Option<PrescriptionId>,
    pub currency: Currency,
    pub items: Vec<InvoiceItem>,
    /// Rate captured at creation, reused when the content is edited
    pub tax_rate: Rate,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub cashier_id: Option<StaffId>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Replaces the items and their totals
    pub(crate) fn replace_items(&mut self, items: Vec<InvoiceItem>, totals: InvoiceTotals) {
        self.items = items;
        self.subtotal = totals.subtotal;
        self.tax = totals.tax;
        self.total = totals.total;
        self.updated_at = Utc::now();
    }

    /// Transitions to a new status, stamping `paid_at` on payment
    pub fn transition_to(&mut self, status: InvoiceStatus) -> Result<(), BillingError> {
        if !self.status.can_transition_to(status) {
            return Err(BillingError::InvalidStatusTransition {
                from: self.status,
                to: status,
            });
        }
        let now = Utc::now();
        if status == InvoiceStatus::Paid && self.paid_at.is_none() {
            self.paid_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    /// Only pending invoices can have their content changed
    pub fn is_editable(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }

    /// True when the invoice is unpaid past its due date
    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        self.status == InvoiceStatus::Pending && as_of > self.due_date
    }
}

/// Admins and cashiers may edit an invoice, and only while it is pending
pub fn can_edit_invoice(role: UserRole, invoice: &Invoice) -> bool {
    role.is_billing_staff() && invoice.is_editable()
}

/// Formats a sequence number into an invoice number
pub(crate) fn invoice_number(year: i32, sequence: u64) -> String {
    format!("INV-{year}-{sequence:06}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn pending_invoice() -> Invoice {
        let now = Utc::now();
        Invoice {
            id: InvoiceId::new_v7(),
            invoice_number: invoice_number(2024, 1),
            patient_id: PatientId::new_v7(),
            consultation_id: ConsultationId::new_v7(),
            prescription_id: None,
            currency: Currency::USD,
            items: vec![],
            tax_rate: Rate::from_percentage(dec!(8)),
            subtotal: usd(dec!(0)),
            tax: usd(dec!(0)),
            total: usd(dec!(0)),
            status: InvoiceStatus::Pending,
            issued_at: now,
            due_date: now.date_naive(),
            paid_at: None,
            payment_method: None,
            payment_reference: None,
            cashier_id: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_table() {
        use InvoiceStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Overdue));
        assert!(!Overdue.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_paid_stamps_paid_at() {
        let mut invoice = pending_invoice();
        invoice.transition_to(InvoiceStatus::Paid).unwrap();
        assert!(invoice.paid_at.is_some());
        assert!(invoice.transition_to(InvoiceStatus::Overdue).is_err());
    }

    #[test]
    fn test_item_total() {
        let item = InvoiceItem::new(InvoiceItemKind::Care, "Injection", 3, usd(dec!(15))).unwrap();
        assert_eq!(item.total, usd(dec!(45)));
    }

    #[test]
    fn test_item_rejects_zero_quantity_and_negative_price() {
        assert!(InvoiceItem::new(InvoiceItemKind::Custom, "Kit", 0, usd(dec!(5))).is_err());
        assert!(InvoiceItem::new(InvoiceItemKind::Custom, "Kit", 1, usd(dec!(-5))).is_err());
    }

    #[test]
    fn test_line_in_foreign_currency_rejected() {
        let line = InvoiceLine::custom("Kit", 1, Money::new(dec!(5), Currency::EUR));
        assert!(matches!(line.into_item(Currency::USD), Err(BillingError::InvalidLineItem(_))));
    }

    #[test]
    fn test_can_edit_invoice() {
        let mut invoice = pending_invoice();
        assert!(can_edit_invoice(UserRole::Cashier, &invoice));
        assert!(!can_edit_invoice(UserRole::Doctor, &invoice));

        invoice.transition_to(InvoiceStatus::Overdue).unwrap();
        assert!(!can_edit_invoice(UserRole::Admin, &invoice));
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(invoice_number(2024, 42), "INV-2024-000042");
    }

    #[test]
    fn test_custom_line_kind_defaults() {
        let line: InvoiceLine = serde_json::from_value(serde_json::json!({
            "name": "Medical certificate",
            "quantity": 1,
            "unit_price": { "amount": "20", "currency": "USD" }
        }))
        .unwrap();
        assert_eq!(line.kind, InvoiceItemKind::Custom);
    }
}
