//! In-memory clinic directory

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use core_kernel::{CareId, ConsultationId, DomainPort, ExamId, MedicationId, PatientId, PortError, SupplyId};
use domain_inventory::MedicalSupply;

use crate::catalog::{MedicalCare, MedicalExam, Medication, Patient};
use crate::consultation::{Consultation, ConsultationStatus};
use crate::ports::{CatalogPort, ConsultationPort};

/// In-memory implementation of [`CatalogPort`] and [`ConsultationPort`]
#[derive(Debug, Default)]
pub struct InMemoryClinicDirectory {
    patients: RwLock<HashMap<PatientId, Patient>>,
    cares: RwLock<HashMap<CareId, MedicalCare>>,
    medications: RwLock<HashMap<MedicationId, Medication>>,
    exams: RwLock<HashMap<ExamId, MedicalExam>>,
    supplies: RwLock<HashMap<SupplyId, MedicalSupply>>,
    consultations: RwLock<HashMap<ConsultationId, Consultation>>,
}

impl InMemoryClinicDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_patient(&self, patient: Patient) {
        self.patients.write().await.insert(patient.id, patient);
    }

    pub async fn upsert_care(&self, care: MedicalCare) {
        self.cares.write().await.insert(care.id, care);
    }

    pub async fn upsert_medication(&self, medication: Medication) {
        self.medications.write().await.insert(medication.id, medication);
    }

    pub async fn upsert_exam(&self, exam: MedicalExam) {
        self.exams.write().await.insert(exam.id, exam);
    }

    pub async fn upsert_supply(&self, supply: MedicalSupply) {
        self.supplies.write().await.insert(supply.id, supply);
    }

    pub async fn upsert_consultation(&self, consultation: Consultation) {
        self.consultations.write().await.insert(consultation.id, consultation);
    }

    /// Updates a consultation's status
    pub async fn set_consultation_status(
        &self,
        id: ConsultationId,
        status: ConsultationStatus,
    ) -> Result<(), PortError> {
        let mut consultations = self.consultations.write().await;
        let consultation = consultations
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Consultation", id))?;
        consultation.status = status;
        Ok(())
    }
}

impl DomainPort for InMemoryClinicDirectory {}

#[async_trait]
impl CatalogPort for InMemoryClinicDirectory {
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError> {
        self.patients
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Patient", id))
    }

    async fn get_medical_care(&self, id: CareId) -> Result<MedicalCare, PortError> {
        self.cares
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("MedicalCare", id))
    }

    async fn get_medication(&self, id: MedicationId) -> Result<Medication, PortError> {
        self.medications
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Medication", id))
    }

    async fn get_medical_exam(&self, id: ExamId) -> Result<MedicalExam, PortError> {
        self.exams
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("MedicalExam", id))
    }

    async fn get_medical_supply(&self, id: SupplyId) -> Result<MedicalSupply, PortError> {
        self.supplies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("MedicalSupply", id))
    }
}

#[async_trait]
impl ConsultationPort for InMemoryClinicDirectory {
    async fn get_consultation(&self, id: ConsultationId) -> Result<Consultation, PortError> {
        self.consultations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Consultation", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{Currency, Money, StaffId};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_upsert_and_get_care() {
        let directory = InMemoryClinicDirectory::new();
        let care = MedicalCare::new(CareId::new_v7(), "Wound dressing", Money::new(dec!(45), Currency::USD));
        directory.upsert_care(care.clone()).await;

        let found = directory.get_medical_care(care.id).await.unwrap();
        assert_eq!(found, care);
    }

    #[tokio::test]
    async fn test_missing_entries_are_not_found() {
        let directory = InMemoryClinicDirectory::new();
        assert!(directory.get_patient(PatientId::new_v7()).await.unwrap_err().is_not_found());
        assert!(directory.get_medication(MedicationId::new_v7()).await.unwrap_err().is_not_found());
        assert!(directory.get_consultation(ConsultationId::new_v7()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_set_consultation_status() {
        let directory = InMemoryClinicDirectory::new();
        let consultation = Consultation::new(PatientId::new_v7(), StaffId::new_v7(), Utc::now());
        directory.upsert_consultation(consultation.clone()).await;

        directory
            .set_consultation_status(consultation.id, ConsultationStatus::Cancelled)
            .await
            .unwrap();

        let found = directory.get_consultation(consultation.id).await.unwrap();
        assert!(found.is_cancelled());
    }
}
