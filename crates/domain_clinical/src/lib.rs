//! Clinical Domain - Catalog access, cares, prescriptions and business rules
//!
//! This crate holds the clinical records that feed an invoice:
//! - Read-only ports to the catalog and to consultations
//! - Care acts performed during a consultation, priced at recording time
//! - Prescriptions with their validity window and billing status
//! - Stateless business rules (allergy cross-check, validity, role gates)

pub mod catalog;
pub mod consultation;
pub mod ports;
pub mod adapters;
pub mod care;
pub mod prescription;
pub mod validation;
pub mod error;

pub use catalog::{MedicalCare, MedicalExam, Medication, Patient};
pub use consultation::{Consultation, ConsultationStatus};
pub use ports::{CatalogPort, ConsultationPort};
pub use adapters::InMemoryClinicDirectory;
pub use care::{CareRegister, ConsultationCare, NewConsultationCare};
pub use prescription::{
    NewPrescription, NewPrescriptionItem, PrescribedItemKind, Prescription, PrescriptionItem,
    PrescriptionRegistry, PrescriptionStatus,
};
pub use validation::{
    can_edit_consultation, can_prescribe, can_record_payment, check_allergy, has_enough_stock,
    is_prescription_valid, screen_medication, AllergyWarning,
};
pub use error::ClinicalError;
