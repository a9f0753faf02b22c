//! Business rules
//!
//! Stateless predicates shared by the clinical and billing flows. None of
//! them touch state; the registries call them at their own choke points.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{MedicationId, PatientId, UserRole};
use domain_inventory::MedicalSupply;

use crate::catalog::{Medication, Patient};
use crate::error::ClinicalError;
use crate::prescription::Prescription;

/// A prescription is valid strictly before its `valid_until` date.
///
/// A prescription checked on its expiry day counts as expired.
pub fn is_prescription_valid(prescription: &Prescription, as_of: NaiveDate) -> bool {
    prescription.valid_until > as_of
}

/// Heuristic allergy cross-check.
///
/// Returns true when the patient's allergy notes contain the medication's
/// commercial or generic name, ignoring case. A false result means "no known
/// flag", not that the medication is safe.
pub fn check_allergy(patient: &Patient, medication: &Medication) -> bool {
    let Some(allergies) = patient.allergies.as_deref() else {
        return false;
    };
    let allergies = allergies.to_lowercase();

    [&medication.commercial_name, &medication.generic_name]
        .into_iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .any(|name| allergies.contains(&name))
}

/// Pre-check before asking the stock ledger for a consumption
pub fn has_enough_stock(supply: &MedicalSupply, requested: u32) -> bool {
    supply.has_enough_stock(requested)
}

/// An allergy flag the prescriber chose to override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergyWarning {
    pub patient_id: PatientId,
    pub medication_id: MedicationId,
    pub medication: String,
    pub allergies: String,
}

/// Screens a medication against a patient's allergies.
///
/// - `Ok(None)` when nothing is flagged
/// - `Err(AllergyFlagged)` when flagged and not acknowledged
/// - `Ok(Some(warning))` when flagged and acknowledged, so the caller can
///   keep a trace of the override
pub fn screen_medication(
    patient: &Patient,
    medication: &Medication,
    acknowledged: bool,
) -> Result<Option<AllergyWarning>, ClinicalError> {
    if !check_allergy(patient, medication) {
        return Ok(None);
    }
    if !acknowledged {
        return Err(ClinicalError::AllergyFlagged {
            patient_id: patient.id,
            medication: medication.commercial_name.clone(),
        });
    }
    Ok(Some(AllergyWarning {
        patient_id: patient.id,
        medication_id: medication.id,
        medication: medication.commercial_name.clone(),
        allergies: patient.allergies.clone().unwrap_or_default(),
    }))
}

/// Cares and supplies may be attached by doctors, nurses and admins
pub fn can_edit_consultation(role: UserRole) -> bool {
    role.is_clinical_staff() || role == UserRole::Admin
}

pub fn can_prescribe(role: UserRole) -> bool {
    matches!(role, UserRole::Doctor | UserRole::Admin)
}

pub fn can_record_payment(role: UserRole) -> bool {
    role.is_billing_staff()
}
