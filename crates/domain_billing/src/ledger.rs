//! Invoice ledger
//!
//! The ledger exclusively owns invoices after creation.
//!
//! # Invariants
//!
//! - At most one invoice exists per consultation. Creation is serialized on
//!   the consultation id, so concurrent attempts yield one invoice and
//!   `DuplicateInvoice` for the rest
//! - `total = subtotal + tax` after every creation and content edit
//! - Content edits are only accepted while the invoice is pending
//! - `paid` is terminal
//!
//! Each invoice lives behind its own mutex. Edits, status changes and
//! payments hold it for the whole check-and-act.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, instrument};

use core_kernel::{lock_within, ConsultationId, InvoiceId, KeyedGuard, KeyedLocks};
use domain_clinical::{CareRegister, ConsultationPort, PrescriptionRegistry};
use domain_inventory::StockLedger;

use crate::aggregator::{totals, ChargeAggregator, ChargeSources};
use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::invoice::{invoice_number, Invoice, InvoiceLine, InvoiceStatus};

/// The clinical records an invoice is built from
#[derive(Clone)]
pub struct ClinicalRecords {
    pub consultations: Arc<dyn ConsultationPort>,
    pub cares: Arc<CareRegister>,
    pub supplies: Arc<StockLedger>,
    pub prescriptions: Arc<PrescriptionRegistry>,
}

/// Owner of all invoices
pub struct InvoiceLedger {
    aggregator: ChargeAggregator,
    records: ClinicalRecords,
    config: RwLock<BillingConfig>,
    invoices: RwLock<HashMap<InvoiceId, Arc<Mutex<Invoice>>>>,
    by_consultation: RwLock<HashMap<ConsultationId, InvoiceId>>,
    creation_locks: KeyedLocks<ConsultationId>,
    sequence: AtomicU64,
    lock_timeout: Duration,
}

impl InvoiceLedger {
    /// Creates an empty ledger
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `config` is not usable
    pub fn new(
        aggregator: ChargeAggregator,
        records: ClinicalRecords,
        config: BillingConfig,
        lock_timeout: Duration,
    ) -> Result<Self, BillingError> {
        config.validate()?;
        Ok(Self {
            aggregator,
            records,
            config: RwLock::new(config),
            invoices: RwLock::new(HashMap::new()),
            by_consultation: RwLock::new(HashMap::new()),
            creation_locks: KeyedLocks::new(lock_timeout),
            sequence: AtomicU64::new(0),
            lock_timeout,
        })
    }

    /// Current billing configuration
    pub async fn config(&self) -> BillingConfig {
        self.config.read().await.clone()
    }

    /// Replaces the billing configuration used by future invoices
    pub async fn update_config(&self, config: BillingConfig) -> Result<(), BillingError> {
        config.validate()?;
        info!(tax_rate = %config.tax_rate, fee = %config.base_consultation_fee, "Billing configuration updated");
        *self.config.write().await = config;
        Ok(())
    }

    /// Locks a consultation against invoice creation.
    ///
    /// Invoice creation takes the same lock, so records changed while the
    /// guard is held are either on the consultation's invoice or were
    /// refused because the invoice already exists.
    pub async fn lock_consultation(&self, consultation_id: ConsultationId) -> Result<KeyedGuard, BillingError> {
        Ok(self.creation_locks.acquire(&consultation_id).await?)
    }

    /// Creates the invoice of a consultation
    pub async fn create(&self, consultation_id: ConsultationId) -> Result<Invoice, BillingError> {
        self.create_with_items(consultation_id, Vec::new()).await
    }

    /// Creates the invoice of a consultation with extra custom lines.
    ///
    /// The consultation's billable prescription, if any, is billed by this
    /// invoice and transitions to `billed`.
    ///
    /// # Errors
    ///
    /// - `DuplicateInvoice` if the consultation is already invoiced
    /// - `Catalog` if the consultation or a catalog entry is unknown
    /// - `ConsultationCancelled` for a cancelled consultation
    /// - `InvalidLineItem` for a malformed custom line
    #[instrument(skip(self, custom_items), fields(consultation_id = %consultation_id))]
    pub async fn create_with_items(
        &self,
        consultation_id: ConsultationId,
        custom_items: Vec<InvoiceLine>,
    ) -> Result<Invoice, BillingError> {
        let _creation = self.creation_locks.acquire(&consultation_id).await?;

        if let Some(existing) = self.by_consultation.read().await.get(&consultation_id) {
            return Err(BillingError::DuplicateInvoice {
                consultation_id: consultation_id.to_string(),
                invoice_id: existing.to_string(),
            });
        }

        let consultation = self.records.consultations.get_consultation(consultation_id).await?;
        if consultation.is_cancelled() {
            return Err(BillingError::ConsultationCancelled(consultation_id.to_string()));
        }

        let cares = self.records.cares.list_for_consultation(consultation_id).await;
        let supplies = self.records.supplies.consumptions_for(consultation_id).await?;
        let prescription = self
            .records
            .prescriptions
            .billable_for_consultation(consultation_id)
            .await;
        let config = self.config().await;

        let sources = ChargeSources {
            consultation: &consultation,
            cares: &cares,
            supplies: &supplies,
            prescription: prescription.as_ref(),
            custom_items: &custom_items,
        };
        let items = self.aggregator.build_invoice_items(sources, &config).await?;
        let totals = totals(&items, config.tax_rate, config.currency)?;

        let issued_at = Utc::now();
        let due_date = issued_at
            .date_naive()
            .checked_add_days(Days::new(u64::from(config.payment_terms_days)))
            .ok_or_else(|| BillingError::Configuration("due date out of range".to_string()))?;

        // Last fallible step: a failure here must leave no invoice behind
        if let Some(prescription) = &prescription {
            self.records.prescriptions.mark_billed(prescription.id).await?;
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let invoice = Invoice {
            id: InvoiceId::new_v7(),
            invoice_number: invoice_number(issued_at.year(), sequence),
            patient_id: consultation.patient_id,
            consultation_id,
            prescription_id: prescription.map(|p| p.id),
            currency: config.currency,
            items,
            tax_rate: config.tax_rate,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            status: InvoiceStatus::Pending,
            issued_at,
            due_date,
            paid_at: None,
            payment_method: None,
            payment_reference: None,
            cashier_id: None,
            updated_at: issued_at,
        };

        self.invoices
            .write()
            .await
            .insert(invoice.id, Arc::new(Mutex::new(invoice.clone())));
        self.by_consultation
            .write()
            .await
            .insert(consultation_id, invoice.id);

        info!(
            invoice_id = %invoice.id,
            number = %invoice.invoice_number,
            total = %invoice.total,
            lines = invoice.items.len(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Replaces the lines of a pending invoice and recomputes its totals
    /// with the tax rate captured at creation
    #[instrument(skip(self, lines), fields(invoice_id = %invoice_id))]
    pub async fn update_content(
        &self,
        invoice_id: InvoiceId,
        lines: Vec<InvoiceLine>,
    ) -> Result<Invoice, BillingError> {
        let mut invoice = self.lock_invoice(invoice_id).await?;

        if !invoice.is_editable() {
            return Err(BillingError::InvoiceNotEditable {
                invoice_id: invoice_id.to_string(),
                status: invoice.status,
            });
        }

        let currency = invoice.currency;
        let items = lines
            .into_iter()
            .map(|line| line.into_item(currency))
            .collect::<Result<Vec<_>, _>>()?;
        let totals = totals(&items, invoice.tax_rate, currency)?;
        invoice.replace_items(items, totals);

        info!(total = %invoice.total, lines = invoice.items.len(), "Invoice content updated");
        Ok(invoice.clone())
    }

    /// Moves an invoice to a new status
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn set_status(
        &self,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice, BillingError> {
        let mut invoice = self.lock_invoice(invoice_id).await?;
        let from = invoice.status;
        invoice.transition_to(status)?;
        info!(%from, to = %status, "Invoice status changed");
        Ok(invoice.clone())
    }

    /// Marks every pending invoice due before `as_of` as overdue
    #[instrument(skip(self))]
    pub async fn mark_overdue(&self, as_of: NaiveDate) -> Result<Vec<Invoice>, BillingError> {
        let mut marked = Vec::new();
        for id in self.invoice_ids().await {
            let mut invoice = self.lock_invoice(id).await?;
            if invoice.is_past_due(as_of) {
                invoice.transition_to(InvoiceStatus::Overdue)?;
                marked.push(invoice.clone());
            }
        }
        if !marked.is_empty() {
            info!(count = marked.len(), "Invoices marked overdue");
        }
        Ok(marked)
    }

    pub async fn get(&self, invoice_id: InvoiceId) -> Result<Invoice, BillingError> {
        Ok(self.lock_invoice(invoice_id).await?.clone())
    }

    /// The invoice of a consultation, if it has been invoiced
    pub async fn find_by_consultation(
        &self,
        consultation_id: ConsultationId,
    ) -> Result<Option<Invoice>, BillingError> {
        let invoice_id = self.by_consultation.read().await.get(&consultation_id).copied();
        match invoice_id {
            Some(id) => self.get(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// All invoices in issue order
    pub async fn list(&self) -> Result<Vec<Invoice>, BillingError> {
        let mut invoices = Vec::new();
        for id in self.invoice_ids().await {
            invoices.push(self.get(id).await?);
        }
        invoices.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
        Ok(invoices)
    }

    /// Locks an invoice for a check-and-act
    pub(crate) async fn lock_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<OwnedMutexGuard<Invoice>, BillingError> {
        let slot = self
            .invoices
            .read()
            .await
            .get(&invoice_id)
            .cloned()
            .ok_or_else(|| BillingError::InvoiceNotFound(invoice_id.to_string()))?;
        Ok(lock_within(slot, self.lock_timeout, invoice_id).await?)
    }

    async fn invoice_ids(&self) -> Vec<InvoiceId> {
        let mut ids: Vec<_> = self.invoices.read().await.keys().copied().collect();
        ids.sort();
        ids
    }
}
