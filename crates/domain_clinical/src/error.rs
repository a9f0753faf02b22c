//! Clinical domain errors
//!
//! This module defines the errors raised while recording cares, managing
//! prescriptions and applying business rules.

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{MoneyError, PatientId, PortError};

/// Errors that can occur in the clinical domain
#[derive(Debug, Error)]
pub enum ClinicalError {
    /// Reference data lookup failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] PortError),

    /// Consultation care record not found
    #[error("Consultation care not found: {0}")]
    CareRecordNotFound(String),

    /// Prescription not found
    #[error("Prescription not found: {0}")]
    PrescriptionNotFound(String),

    /// The prescription's validity window has passed
    #[error("Prescription {id} expired (valid until {valid_until})")]
    PrescriptionExpired {
        id: String,
        valid_until: NaiveDate,
    },

    /// The consultation already has an open prescription
    #[error("Consultation {0} already has an open prescription")]
    PrescriptionAlreadyExists(String),

    /// Invalid prescription content
    #[error("Invalid prescription: {0}")]
    InvalidPrescription(String),

    /// Invalid state transition attempted
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStatusTransition {
        from: String,
        to: String,
    },

    /// A medication matches the patient's recorded allergies.
    ///
    /// This is a confirm-to-proceed gate: retrying with the warning
    /// acknowledged succeeds.
    #[error("Possible allergy: patient {patient_id} reports allergies matching {medication}")]
    AllergyFlagged {
        patient_id: PatientId,
        medication: String,
    },

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Price calculation error
    #[error("Calculation error: {0}")]
    Money(#[from] MoneyError),
}

impl ClinicalError {
    /// Returns true for warnings the caller may override by acknowledging
    pub fn is_acknowledgeable(&self) -> bool {
        matches!(self, ClinicalError::AllergyFlagged { .. })
    }
}
