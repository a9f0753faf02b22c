//! Consultations as seen by the billing core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ConsultationId, PatientId, StaffId};

/// Consultation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// A clinical encounter between a patient and a doctor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub patient_id: PatientId,
    pub doctor_id: StaffId,
    pub scheduled_at: DateTime<Utc>,
    pub status: ConsultationStatus,
    pub reason: Option<String>,
}

impl Consultation {
    /// Creates a scheduled consultation
    pub fn new(patient_id: PatientId, doctor_id: StaffId, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id: ConsultationId::new_v7(),
            patient_id,
            doctor_id,
            scheduled_at,
            status: ConsultationStatus::Scheduled,
            reason: None,
        }
    }

    /// Sets the status
    pub fn with_status(mut self, status: ConsultationStatus) -> Self {
        self.status = status;
        self
    }

    /// Cancelled consultations accept no cares, supplies or invoices
    pub fn is_cancelled(&self) -> bool {
        self.status == ConsultationStatus::Cancelled
    }
}
