//! Charge aggregation
//!
//! Turns a consultation's clinical records into priced invoice lines:
//!
//! 1. the base consultation fee, once
//! 2. one line per performed care, at the care record's price
//! 3. one line per consumed supply, at the consumption record's price
//! 4. one line per item of the consultation's active or completed
//!    prescription, at the prescription's price
//! 5. caller-supplied custom lines, as given
//!
//! Names and descriptions come from the catalog at aggregation time. Prices
//! never do: they were captured when each record was created.

use std::sync::Arc;

use tracing::debug;

use core_kernel::{Currency, Money, Rate};
use domain_clinical::{CatalogPort, Consultation, ConsultationCare, PrescribedItemKind, Prescription};
use domain_inventory::ConsultationSupply;

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::invoice::{InvoiceItem, InvoiceItemKind, InvoiceLine, InvoiceTotals};

/// Everything billable for one consultation
#[derive(Debug, Clone, Copy)]
pub struct ChargeSources<'a> {
    pub consultation: &'a Consultation,
    pub cares: &'a [ConsultationCare],
    pub supplies: &'a [ConsultationSupply],
    pub prescription: Option<&'a Prescription>,
    pub custom_items: &'a [InvoiceLine],
}

/// Builds invoice lines from clinical records
pub struct ChargeAggregator {
    catalog: Arc<dyn CatalogPort>,
}

impl ChargeAggregator {
    pub fn new(catalog: Arc<dyn CatalogPort>) -> Self {
        Self { catalog }
    }

    /// Collects every billable line of a consultation
    pub async fn build_invoice_items(
        &self,
        sources: ChargeSources<'_>,
        config: &BillingConfig,
    ) -> Result<Vec<InvoiceItem>, BillingError> {
        let currency = config.currency;
        let mut items = Vec::new();

        items.push(
            InvoiceItem::new(
                InvoiceItemKind::ConsultationFee,
                "Consultation fee",
                1,
                in_currency(config.base_consultation_fee, currency, "consultation fee")?,
            )?
            .with_source(sources.consultation.id),
        );

        for care in sources.cares {
            let entry = self.catalog.get_medical_care(care.care_id).await?;
            let item = InvoiceItem::new(
                InvoiceItemKind::Care,
                entry.name,
                care.quantity,
                in_currency(care.unit_price, currency, "care")?,
            )?
            .with_description(entry.description)
            .with_source(care.id);
            items.push(item);
        }

        for consumption in sources.supplies {
            let entry = self.catalog.get_medical_supply(consumption.supply_id).await?;
            let item = InvoiceItem::new(
                InvoiceItemKind::Supply,
                entry.name,
                consumption.quantity,
                in_currency(consumption.unit_price, currency, "supply")?,
            )?
            .with_description(Some(entry.unit).filter(|unit| !unit.is_empty()))
            .with_source(consumption.id);
            items.push(item);
        }

        if let Some(prescription) = sources.prescription.filter(|p| p.status.is_billable()) {
            for line in &prescription.items {
                let (kind, name, description) = match line.kind {
                    PrescribedItemKind::Medication(id) => {
                        let medication = self.catalog.get_medication(id).await?;
                        (InvoiceItemKind::Medication, medication.commercial_name, Some(medication.generic_name))
                    }
                    PrescribedItemKind::Exam(id) => {
                        let exam = self.catalog.get_medical_exam(id).await?;
                        (InvoiceItemKind::Exam, exam.name, exam.description)
                    }
                    PrescribedItemKind::Care(id) => {
                        let care = self.catalog.get_medical_care(id).await?;
                        (InvoiceItemKind::Care, care.name, care.description)
                    }
                };
                let item = InvoiceItem::new(
                    kind,
                    name,
                    line.quantity,
                    in_currency(line.unit_price, currency, "prescription item")?,
                )?
                .with_description(description.or_else(|| line.instructions.clone()))
                .with_source(line.id);
                items.push(item);
            }
        }

        for line in sources.custom_items {
            items.push(line.clone().into_item(currency)?);
        }

        debug!(consultation_id = %sources.consultation.id, lines = items.len(), "Charges aggregated");
        Ok(items)
    }
}

/// Computes subtotal, tax and total.
///
/// `subtotal = Σ total`, `tax = subtotal × rate` rounded to the currency's
/// minor unit, `total = subtotal + tax`.
pub fn totals(items: &[InvoiceItem], tax_rate: Rate, currency: Currency) -> Result<InvoiceTotals, BillingError> {
    let subtotal = Money::sum(items.iter().map(|item| &item.total), currency)?;
    let tax = tax_rate.apply(&subtotal)?;
    let total = subtotal.checked_add(&tax)?;
    Ok(InvoiceTotals { subtotal, tax, total })
}

fn in_currency(price: Money, currency: Currency, what: &str) -> Result<Money, BillingError> {
    if price.currency() != currency {
        return Err(BillingError::InvalidLineItem(format!(
            "{what} is priced in {} but invoices are in {}",
            price.currency(),
            currency
        )));
    }
    Ok(price)
}
