//! Prescriptions
//!
//! A prescription is a doctor's order of medications, exams and cares tied to
//! a consultation. Each item carries the price it had when prescribed; an
//! invoice bills those prices, never the current catalog ones.
//!
//! Status lifecycle:
//!
//! ```text
//! active ──► completed ──► billed
//!   │  └────────────────────▲
//!   └──► cancelled
//! ```
//!
//! An active or completed prescription is billed once, by the invoice of its
//! consultation. Cancelled and billed prescriptions are never billed again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use core_kernel::{
    CareId, ConsultationId, ExamId, MedicationId, Money, PatientId, PrescriptionId,
    PrescriptionItemId, StaffId,
};

use crate::error::ClinicalError;
use crate::ports::CatalogPort;
use crate::validation::{is_prescription_valid, screen_medication, AllergyWarning};

/// Prescription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
    Billed,
}

impl PrescriptionStatus {
    /// Active and completed prescriptions still have to be billed
    pub fn is_billable(&self) -> bool {
        matches!(self, PrescriptionStatus::Active | PrescriptionStatus::Completed)
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
            PrescriptionStatus::Cancelled => "cancelled",
            PrescriptionStatus::Billed => "billed",
        };
        f.write_str(name)
    }
}

/// What a prescription item orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PrescribedItemKind {
    Medication(MedicationId),
    Exam(ExamId),
    Care(CareId),
}

/// A priced line of a prescription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub id: PrescriptionItemId,
    pub kind: PrescribedItemKind,
    pub quantity: u32,
    /// Catalog price when the prescription was written
    pub unit_price: Money,
    pub total_price: Money,
    pub instructions: Option<String>,
}

impl PrescriptionItem {
    pub fn new(kind: PrescribedItemKind, quantity: u32, unit_price: Money) -> Result<Self, ClinicalError> {
        if quantity == 0 {
            return Err(ClinicalError::InvalidQuantity(
                "prescribed quantity must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            id: PrescriptionItemId::new_v7(),
            kind,
            quantity,
            unit_price,
            total_price: unit_price.times(quantity)?,
            instructions: None,
        })
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// A doctor's order tied to a consultation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub consultation_id: ConsultationId,
    pub patient_id: PatientId,
    pub doctor_id: StaffId,
    pub items: Vec<PrescriptionItem>,
    pub valid_until: NaiveDate,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    /// Allergy flags overridden when the prescription was written
    pub acknowledged_warnings: Vec<AllergyWarning>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// Creates an active prescription
    pub fn new(
        consultation_id: ConsultationId,
        patient_id: PatientId,
        doctor_id: StaffId,
        valid_until: NaiveDate,
        items: Vec<PrescriptionItem>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PrescriptionId::new_v7(),
            consultation_id,
            patient_id,
            doctor_id,
            items,
            valid_until,
            status: PrescriptionStatus::Active,
            notes: None,
            acknowledged_warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transitions to a new status
    pub fn transition_to(&mut self, status: PrescriptionStatus) -> Result<(), ClinicalError> {
        if !self.can_transition_to(status) {
            return Err(ClinicalError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn can_transition_to(&self, target: PrescriptionStatus) -> bool {
        use PrescriptionStatus::*;
        matches!(
            (self.status, target),
            (Active, Completed) |
            (Active, Cancelled) |
            (Active, Billed) |
            (Completed, Billed)
        )
    }
}

/// A line of a prescription being written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescriptionItem {
    pub kind: PrescribedItemKind,
    pub quantity: u32,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// A prescription being written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub consultation_id: ConsultationId,
    pub patient_id: PatientId,
    pub doctor_id: StaffId,
    pub valid_until: NaiveDate,
    pub items: Vec<NewPrescriptionItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Registry of prescriptions
pub struct PrescriptionRegistry {
    catalog: Arc<dyn CatalogPort>,
    prescriptions: RwLock<HashMap<PrescriptionId, Prescription>>,
}

impl PrescriptionRegistry {
    pub fn new(catalog: Arc<dyn CatalogPort>) -> Self {
        Self {
            catalog,
            prescriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Writes a prescription.
    ///
    /// Items are priced from the catalog. Every medication is screened
    /// against the patient's allergies; a flagged medication fails with
    /// `AllergyFlagged` unless `acknowledged` is set, in which case the
    /// warning is kept on the prescription.
    ///
    /// A consultation holds at most one active or completed prescription.
    #[instrument(skip(self, request), fields(consultation_id = %request.consultation_id))]
    pub async fn register(
        &self,
        request: NewPrescription,
        acknowledged: bool,
    ) -> Result<Prescription, ClinicalError> {
        if request.items.is_empty() {
            return Err(ClinicalError::InvalidPrescription(
                "a prescription needs at least one item".to_string(),
            ));
        }
        let today = Utc::now().date_naive();
        if request.valid_until <= today {
            return Err(ClinicalError::InvalidPrescription(format!(
                "valid_until {} must be after {}",
                request.valid_until, today
            )));
        }

        let patient = self.catalog.get_patient(request.patient_id).await?;
        let mut items = Vec::with_capacity(request.items.len());
        let mut warnings = Vec::new();

        for line in &request.items {
            let unit_price = match line.kind {
                PrescribedItemKind::Medication(id) => {
                    let medication = self.catalog.get_medication(id).await?;
                    if let Some(warning) = screen_medication(&patient, &medication, acknowledged)? {
                        warn!(medication = %warning.medication, "Allergy flag acknowledged");
                        warnings.push(warning);
                    }
                    medication.unit_price
                }
                PrescribedItemKind::Exam(id) => self.catalog.get_medical_exam(id).await?.unit_price,
                PrescribedItemKind::Care(id) => self.catalog.get_medical_care(id).await?.unit_price,
            };
            let mut item = PrescriptionItem::new(line.kind, line.quantity, unit_price)?;
            item.instructions = line.instructions.clone();
            items.push(item);
        }

        let mut prescription = Prescription::new(
            request.consultation_id,
            request.patient_id,
            request.doctor_id,
            request.valid_until,
            items,
        );
        prescription.notes = request.notes;
        prescription.acknowledged_warnings = warnings;

        let mut prescriptions = self.prescriptions.write().await;
        let open = prescriptions
            .values()
            .any(|p| p.consultation_id == request.consultation_id && p.status.is_billable());
        if open {
            return Err(ClinicalError::PrescriptionAlreadyExists(
                request.consultation_id.to_string(),
            ));
        }
        prescriptions.insert(prescription.id, prescription.clone());

        info!(prescription_id = %prescription.id, items = prescription.items.len(), "Prescription registered");
        Ok(prescription)
    }

    pub async fn get(&self, id: PrescriptionId) -> Result<Prescription, ClinicalError> {
        self.prescriptions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ClinicalError::PrescriptionNotFound(id.to_string()))
    }

    /// The consultation's prescription still awaiting billing, if any
    pub async fn billable_for_consultation(&self, consultation_id: ConsultationId) -> Option<Prescription> {
        self.prescriptions
            .read()
            .await
            .values()
            .find(|p| p.consultation_id == consultation_id && p.status.is_billable())
            .cloned()
    }

    /// Marks a prescription as dispensed.
    ///
    /// Fails with `PrescriptionExpired` when the prescription is no longer
    /// valid on `as_of`.
    #[instrument(skip(self))]
    pub async fn complete(&self, id: PrescriptionId, as_of: NaiveDate) -> Result<Prescription, ClinicalError> {
        let mut prescriptions = self.prescriptions.write().await;
        let prescription = prescriptions
            .get_mut(&id)
            .ok_or_else(|| ClinicalError::PrescriptionNotFound(id.to_string()))?;

        if !is_prescription_valid(prescription, as_of) {
            return Err(ClinicalError::PrescriptionExpired {
                id: id.to_string(),
                valid_until: prescription.valid_until,
            });
        }
        prescription.transition_to(PrescriptionStatus::Completed)?;
        Ok(prescription.clone())
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, id: PrescriptionId) -> Result<Prescription, ClinicalError> {
        self.transition(id, PrescriptionStatus::Cancelled).await
    }

    /// Marks a prescription as billed; it will not be billed again
    #[instrument(skip(self))]
    pub async fn mark_billed(&self, id: PrescriptionId) -> Result<Prescription, ClinicalError> {
        self.transition(id, PrescriptionStatus::Billed).await
    }

    async fn transition(
        &self,
        id: PrescriptionId,
        status: PrescriptionStatus,
    ) -> Result<Prescription, ClinicalError> {
        let mut prescriptions = self.prescriptions.write().await;
        let prescription = prescriptions
            .get_mut(&id)
            .ok_or_else(|| ClinicalError::PrescriptionNotFound(id.to_string()))?;
        prescription.transition_to(status)?;
        info!(status = %status, "Prescription status changed");
        Ok(prescription.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn prescription() -> Prescription {
        Prescription::new(
            ConsultationId::new_v7(),
            PatientId::new_v7(),
            StaffId::new_v7(),
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            vec![],
        )
    }

    #[test]
    fn test_status_transitions() {
        let mut p = prescription();
        assert!(p.transition_to(PrescriptionStatus::Completed).is_ok());
        assert!(p.transition_to(PrescriptionStatus::Cancelled).is_err());
        assert!(p.transition_to(PrescriptionStatus::Billed).is_ok());
        assert!(p.transition_to(PrescriptionStatus::Billed).is_err());
        assert!(p.transition_to(PrescriptionStatus::Active).is_err());
    }

    #[test]
    fn test_cancelled_is_final() {
        let mut p = prescription();
        p.transition_to(PrescriptionStatus::Cancelled).unwrap();
        let err = p.transition_to(PrescriptionStatus::Billed).unwrap_err();
        assert!(matches!(err, ClinicalError::InvalidStatusTransition { .. }));
        assert!(!p.status.is_billable());
    }

    #[test]
    fn test_item_total() {
        let item = PrescriptionItem::new(
            PrescribedItemKind::Medication(MedicationId::new_v7()),
            3,
            Money::new(dec!(4.50), Currency::USD),
        )
        .unwrap();
        assert_eq!(item.total_price, Money::new(dec!(13.50), Currency::USD));
    }

    #[test]
    fn test_item_zero_quantity_rejected() {
        let result = PrescriptionItem::new(
            PrescribedItemKind::Exam(ExamId::new_v7()),
            0,
            Money::new(dec!(30), Currency::USD),
        );
        assert!(matches!(result, Err(ClinicalError::InvalidQuantity(_))));
    }

    #[test]
    fn test_item_kind_serialization() {
        let id = CareId::new_v7();
        let json = serde_json::to_value(PrescribedItemKind::Care(id)).unwrap();
        assert_eq!(json["type"], "care");
    }
}
