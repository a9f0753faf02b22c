//! Catalog reference data
//!
//! These records belong to the external catalog. The billing core reads them
//! through [`crate::ports::CatalogPort`] and copies prices out of them at the
//! moment of consumption or aggregation; it never holds on to them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{CareId, ExamId, MedicationId, Money, PatientId};

/// A patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Free-text allergy notes as typed at intake (e.g. "Penicillin, latex")
    pub allergies: Option<String>,
}

impl Patient {
    /// Creates a patient with no recorded allergies
    pub fn new(id: PatientId, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: None,
            allergies: None,
        }
    }

    /// Records the allergy notes
    pub fn with_allergies(mut self, allergies: impl Into<String>) -> Self {
        self.allergies = Some(allergies.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A medication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: MedicationId,
    pub commercial_name: String,
    pub generic_name: String,
    /// e.g. "500mg tablet"
    pub form: Option<String>,
    pub unit_price: Money,
}

impl Medication {
    pub fn new(
        id: MedicationId,
        commercial_name: impl Into<String>,
        generic_name: impl Into<String>,
        unit_price: Money,
    ) -> Self {
        Self {
            id,
            commercial_name: commercial_name.into(),
            generic_name: generic_name.into(),
            form: None,
            unit_price,
        }
    }
}

/// A medical exam (lab test, imaging, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalExam {
    pub id: ExamId,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Money,
}

impl MedicalExam {
    pub fn new(id: ExamId, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            unit_price,
        }
    }
}

/// A billable medical care act (dressing, injection, suture, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalCare {
    pub id: CareId,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Money,
    pub duration_minutes: Option<u32>,
}

impl MedicalCare {
    pub fn new(id: CareId, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            unit_price,
            duration_minutes: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
