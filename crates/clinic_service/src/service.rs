//! Clinic billing service
//!
//! [`ClinicService`] is the operation surface exposed to the front desk and
//! the clinical UI. It composes the stock ledger, the care register, the
//! prescription registry, the invoice ledger and the payment recorder, and
//! applies the role gates and the consultation editing window on top of
//! them.
//!
//! A consultation can be edited (supplies, cares, prescriptions) until it is
//! cancelled or invoiced. Edits hold the consultation's invoicing lock, so an
//! edit either lands before the invoice is built or is refused after it.
//! Every operation returns the resulting entity or a typed error; a rejected
//! operation changes nothing.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use core_kernel::{
    ConsultationCareId, ConsultationId, ConsultationSupplyId, InvoiceId, KeyedGuard, Money,
    PrescriptionId, StaffId, SupplyId, UserRole,
};
use domain_billing::{
    BillingConfig, ChargeAggregator, ClinicalRecords, Invoice, InvoiceLedger, InvoiceLine,
    InvoiceStatus, Payment, PaymentMethod, PaymentRecorder, PaymentRequest,
};
use domain_clinical::{
    can_edit_consultation, can_prescribe, can_record_payment, CareRegister, CatalogPort,
    ClinicalError, Consultation, ConsultationCare, ConsultationPort, InMemoryClinicDirectory, NewConsultationCare,
    NewPrescription, Prescription, PrescriptionRegistry,
};
use domain_inventory::{Consumption, ConsultationSupply, LowStockAlert, MedicalSupply, StockLedger};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// The staff member performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Actor {
    pub staff_id: StaffId,
    pub role: UserRole,
}

impl Actor {
    pub fn new(staff_id: StaffId, role: UserRole) -> Self {
        Self { staff_id, role }
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), ServiceError> {
        if allowed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden {
                role: self.role,
                action,
            })
        }
    }
}

/// Clinic billing and inventory operations
pub struct ClinicService {
    consultations: Arc<dyn ConsultationPort>,
    stock: Arc<StockLedger>,
    cares: Arc<CareRegister>,
    prescriptions: Arc<PrescriptionRegistry>,
    invoices: Arc<InvoiceLedger>,
    payments: PaymentRecorder,
}

impl ClinicService {
    /// Wires the service over external catalog and consultation sources
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        consultations: Arc<dyn ConsultationPort>,
        config: &ServiceConfig,
    ) -> Result<Self, ServiceError> {
        let stock = Arc::new(StockLedger::new(config.low_stock_alert_policy, config.lock_timeout()));
        let cares = Arc::new(CareRegister::new(catalog.clone()));
        let prescriptions = Arc::new(PrescriptionRegistry::new(catalog.clone()));

        let records = ClinicalRecords {
            consultations: consultations.clone(),
            cares: cares.clone(),
            supplies: stock.clone(),
            prescriptions: prescriptions.clone(),
        };
        let invoices = Arc::new(InvoiceLedger::new(
            ChargeAggregator::new(catalog),
            records,
            config.billing()?,
            config.lock_timeout(),
        )?);
        let payments = PaymentRecorder::new(invoices.clone());

        Ok(Self {
            consultations,
            stock,
            cares,
            prescriptions,
            invoices,
            payments,
        })
    }

    /// Wires the service over an in-memory directory
    pub fn with_directory(
        directory: Arc<InMemoryClinicDirectory>,
        config: &ServiceConfig,
    ) -> Result<Self, ServiceError> {
        Self::new(directory.clone(), directory, config)
    }

    // ------------------------------------------------------------------
    // Supplies
    // ------------------------------------------------------------------

    /// Puts a supply under stock control
    pub async fn register_supply(&self, actor: &Actor, supply: MedicalSupply) -> Result<MedicalSupply, ServiceError> {
        actor.require(can_edit_consultation(actor.role), "register a supply")?;
        let id = supply.id;
        self.stock.register(supply).await?;
        Ok(self.stock.supply(id).await?)
    }

    pub async fn restock_supply(
        &self,
        actor: &Actor,
        supply_id: SupplyId,
        quantity: u32,
    ) -> Result<MedicalSupply, ServiceError> {
        actor.require(can_edit_consultation(actor.role), "restock a supply")?;
        Ok(self.stock.restock(supply_id, quantity).await?)
    }

    /// Attaches a supply to a consultation, taking it out of stock
    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub async fn consume_supply(
        &self,
        actor: &Actor,
        consultation_id: ConsultationId,
        supply_id: SupplyId,
        quantity: u32,
    ) -> Result<Consumption, ServiceError> {
        actor.require(can_edit_consultation(actor.role), "attach a supply")?;
        let _window = self.open_for_editing(consultation_id).await?;
        Ok(self.stock.consume(consultation_id, supply_id, quantity).await?)
    }

    /// Detaches a supply from a consultation, returning it to stock
    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub async fn reverse_supply_consumption(
        &self,
        actor: &Actor,
        consumption_id: ConsultationSupplyId,
    ) -> Result<ConsultationSupply, ServiceError> {
        actor.require(can_edit_consultation(actor.role), "detach a supply")?;
        let record = self.stock.consumption(consumption_id).await?;
        let _window = self.open_for_editing(record.consultation_id).await?;
        Ok(self.stock.reverse(consumption_id).await?)
    }

    pub async fn supply(&self, supply_id: SupplyId) -> Result<MedicalSupply, ServiceError> {
        Ok(self.stock.supply(supply_id).await?)
    }

    pub async fn supplies_for(&self, consultation_id: ConsultationId) -> Result<Vec<ConsultationSupply>, ServiceError> {
        Ok(self.stock.consumptions_for(consultation_id).await?)
    }

    pub async fn low_stock_report(&self) -> Result<Vec<LowStockAlert>, ServiceError> {
        Ok(self.stock.low_stock_report().await?)
    }

    // ------------------------------------------------------------------
    // Cares
    // ------------------------------------------------------------------

    #[instrument(skip(self, actor, care), fields(role = %actor.role))]
    pub async fn add_consultation_care(
        &self,
        actor: &Actor,
        consultation_id: ConsultationId,
        care: NewConsultationCare,
    ) -> Result<ConsultationCare, ServiceError> {
        actor.require(can_edit_consultation(actor.role), "record a care")?;
        let _window = self.open_for_editing(consultation_id).await?;
        let care = NewConsultationCare {
            performed_by: care.performed_by.or(Some(actor.staff_id)),
            ..care
        };
        Ok(self.cares.add_care(consultation_id, care).await?)
    }

    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub async fn remove_consultation_care(
        &self,
        actor: &Actor,
        care_record_id: ConsultationCareId,
    ) -> Result<ConsultationCare, ServiceError> {
        actor.require(can_edit_consultation(actor.role), "remove a care")?;
        let record = self.cares.get(care_record_id).await?;
        let _window = self.open_for_editing(record.consultation_id).await?;
        Ok(self.cares.remove_care(care_record_id).await?)
    }

    pub async fn cares_for(&self, consultation_id: ConsultationId) -> Vec<ConsultationCare> {
        self.cares.list_for_consultation(consultation_id).await
    }

    // ------------------------------------------------------------------
    // Prescriptions
    // ------------------------------------------------------------------

    /// Writes a prescription; see [`PrescriptionRegistry::register`].
    ///
    /// The prescription must name the consultation's patient, and a doctor
    /// prescribes only under their own name.
    pub async fn register_prescription(
        &self,
        actor: &Actor,
        prescription: NewPrescription,
        acknowledged: bool,
    ) -> Result<Prescription, ServiceError> {
        actor.require(can_prescribe(actor.role), "write a prescription")?;
        actor.require(
            actor.role == UserRole::Admin || prescription.doctor_id == actor.staff_id,
            "prescribe under another doctor's name",
        )?;
        let (_window, consultation) = self.open_for_editing(prescription.consultation_id).await?;
        if prescription.patient_id != consultation.patient_id {
            return Err(ClinicalError::InvalidPrescription(format!(
                "patient {} is not the patient of consultation {}",
                prescription.patient_id, consultation.id
            ))
            .into());
        }
        Ok(self.prescriptions.register(prescription, acknowledged).await?)
    }

    pub async fn complete_prescription(
        &self,
        actor: &Actor,
        prescription_id: PrescriptionId,
        as_of: NaiveDate,
    ) -> Result<Prescription, ServiceError> {
        actor.require(can_edit_consultation(actor.role), "complete a prescription")?;
        Ok(self.prescriptions.complete(prescription_id, as_of).await?)
    }

    pub async fn cancel_prescription(
        &self,
        actor: &Actor,
        prescription_id: PrescriptionId,
    ) -> Result<Prescription, ServiceError> {
        actor.require(can_prescribe(actor.role), "cancel a prescription")?;
        Ok(self.prescriptions.cancel(prescription_id).await?)
    }

    pub async fn prescription(&self, prescription_id: PrescriptionId) -> Result<Prescription, ServiceError> {
        Ok(self.prescriptions.get(prescription_id).await?)
    }

    // ------------------------------------------------------------------
    // Invoices
    // ------------------------------------------------------------------

    pub async fn create_invoice(
        &self,
        actor: &Actor,
        consultation_id: ConsultationId,
    ) -> Result<Invoice, ServiceError> {
        self.create_custom_invoice(actor, consultation_id, Vec::new()).await
    }

    #[instrument(skip(self, actor, custom_items), fields(role = %actor.role))]
    pub async fn create_custom_invoice(
        &self,
        actor: &Actor,
        consultation_id: ConsultationId,
        custom_items: Vec<InvoiceLine>,
    ) -> Result<Invoice, ServiceError> {
        actor.require(actor.role.is_billing_staff(), "create an invoice")?;
        Ok(self.invoices.create_with_items(consultation_id, custom_items).await?)
    }

    pub async fn update_invoice_content(
        &self,
        actor: &Actor,
        invoice_id: InvoiceId,
        items: Vec<InvoiceLine>,
    ) -> Result<Invoice, ServiceError> {
        actor.require(actor.role.is_billing_staff(), "edit an invoice")?;
        Ok(self.invoices.update_content(invoice_id, items).await?)
    }

    pub async fn set_invoice_status(
        &self,
        actor: &Actor,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice, ServiceError> {
        actor.require(actor.role.is_billing_staff(), "change an invoice status")?;
        Ok(self.invoices.set_status(invoice_id, status).await?)
    }

    /// Sweeps pending invoices past their due date to overdue
    pub async fn mark_overdue_invoices(&self, actor: &Actor, as_of: NaiveDate) -> Result<Vec<Invoice>, ServiceError> {
        actor.require(actor.role.is_billing_staff(), "mark invoices overdue")?;
        Ok(self.invoices.mark_overdue(as_of).await?)
    }

    pub async fn invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, ServiceError> {
        Ok(self.invoices.get(invoice_id).await?)
    }

    pub async fn invoice_for_consultation(
        &self,
        consultation_id: ConsultationId,
    ) -> Result<Option<Invoice>, ServiceError> {
        Ok(self.invoices.find_by_consultation(consultation_id).await?)
    }

    pub async fn invoices(&self) -> Result<Vec<Invoice>, ServiceError> {
        Ok(self.invoices.list().await?)
    }

    /// Replaces the tax rate and base fee used by future invoices
    pub async fn update_billing_config(&self, actor: &Actor, config: BillingConfig) -> Result<(), ServiceError> {
        actor.require(actor.role == UserRole::Admin, "change the billing configuration")?;
        Ok(self.invoices.update_config(config).await?)
    }

    pub async fn billing_config(&self) -> BillingConfig {
        self.invoices.config().await
    }

    // ------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------

    /// Records a payment; the actor is stamped as the cashier
    pub async fn record_payment(
        &self,
        actor: &Actor,
        invoice_id: InvoiceId,
        amount: Money,
        method: PaymentMethod,
        reference: Option<String>,
        notes: Option<String>,
    ) -> Result<Payment, ServiceError> {
        actor.require(can_record_payment(actor.role), "record a payment")?;
        let request = PaymentRequest {
            invoice_id,
            amount,
            method,
            reference,
            notes,
            cashier_id: actor.staff_id,
        };
        Ok(self.payments.record_payment(request).await?)
    }

    pub async fn payments_for(&self, invoice_id: InvoiceId) -> Vec<Payment> {
        self.payments.payments_for(invoice_id).await
    }

    /// Takes the consultation's invoicing lock and checks the consultation
    /// still accepts records. The edit must run while the guard is held.
    async fn open_for_editing(
        &self,
        consultation_id: ConsultationId,
    ) -> Result<(KeyedGuard, Consultation), ServiceError> {
        let guard = self.invoices.lock_consultation(consultation_id).await?;
        let consultation = self.consultations.get_consultation(consultation_id).await?;
        if consultation.is_cancelled() {
            return Err(ServiceError::ConsultationClosed {
                consultation_id: consultation_id.to_string(),
                reason: "cancelled",
            });
        }
        if self.invoices.find_by_consultation(consultation_id).await?.is_some() {
            info!(%consultation_id, "Edit rejected on an invoiced consultation");
            return Err(ServiceError::ConsultationClosed {
                consultation_id: consultation_id.to_string(),
                reason: "already invoiced",
            });
        }
        Ok((guard, consultation))
    }
}
