//! Clinical Domain Ports
//!
//! The billing core does not own reference data. Patients, catalog items and
//! consultations are read through the traits defined here, so the clinic's
//! actual directory (a database, a remote EHR, the in-memory adapter used in
//! tests) can be swapped at startup.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_clinical::ports::CatalogPort;
//! use std::sync::Arc;
//!
//! pub struct CareRegister {
//!     catalog: Arc<dyn CatalogPort>,
//! }
//!
//! let care = catalog.get_medical_care(care_id).await?;
//! let snapshot = care.unit_price;
//! ```
//!
//! Prices returned by the catalog are current prices. Callers copy them into
//! their own records at the moment of consumption and never look them up
//! again for an existing record.

use async_trait::async_trait;

use core_kernel::{CareId, ConsultationId, DomainPort, ExamId, MedicationId, PatientId, PortError, SupplyId};
use domain_inventory::MedicalSupply;

use crate::catalog::{MedicalCare, MedicalExam, Medication, Patient};
use crate::consultation::Consultation;

/// Read-only access to the clinic catalog
#[async_trait]
pub trait CatalogPort: DomainPort {
    /// Retrieves a patient by ID
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError>;

    /// Retrieves a medical care act by ID
    async fn get_medical_care(&self, id: CareId) -> Result<MedicalCare, PortError>;

    /// Retrieves a medication by ID
    async fn get_medication(&self, id: MedicationId) -> Result<Medication, PortError>;

    /// Retrieves a medical exam by ID
    async fn get_medical_exam(&self, id: ExamId) -> Result<MedicalExam, PortError>;

    /// Retrieves a supply's catalog entry by ID.
    ///
    /// The stock quantity on the returned record is informational only; the
    /// stock ledger owns the live count.
    async fn get_medical_supply(&self, id: SupplyId) -> Result<MedicalSupply, PortError>;
}

/// Read-only access to consultations
#[async_trait]
pub trait ConsultationPort: DomainPort {
    /// Retrieves a consultation by ID
    async fn get_consultation(&self, id: ConsultationId) -> Result<Consultation, PortError>;
}
