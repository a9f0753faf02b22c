//! Test Data Builders
//!
//! Builds an in-memory clinic directory seeded with the standard fixtures
//! and one open consultation. Tests override only what they care about.

use std::sync::Arc;

use chrono::Utc;
use core_kernel::StaffId;
use domain_clinical::{
    Consultation, ConsultationStatus, InMemoryClinicDirectory, MedicalCare, MedicalExam, Medication,
    Patient,
};
use domain_inventory::MedicalSupply;

use crate::fixtures::CatalogFixtures;

/// A seeded directory and handles to what it holds
pub struct TestClinic {
    pub directory: Arc<InMemoryClinicDirectory>,
    pub patient: Patient,
    pub allergic_patient: Patient,
    pub doctor_id: StaffId,
    pub consultation: Consultation,
    pub dressing: MedicalCare,
    pub injection: MedicalCare,
    pub gauze: MedicalSupply,
    pub suture_kit: MedicalSupply,
    pub paracetamol: Medication,
    pub amoxicillin: Medication,
    pub blood_panel: MedicalExam,
}

impl TestClinic {
    /// Adds another consultation for `patient`
    pub async fn open_consultation(&self, patient: &Patient) -> Consultation {
        let consultation = Consultation::new(patient.id, self.doctor_id, Utc::now())
            .with_status(ConsultationStatus::InProgress);
        self.directory.upsert_consultation(consultation.clone()).await;
        consultation
    }

    /// Supplies to put under stock control
    pub fn supplies(&self) -> Vec<MedicalSupply> {
        vec![self.gauze.clone(), self.suture_kit.clone()]
    }
}

/// Builder for a seeded test clinic
pub struct TestClinicBuilder {
    consultation_status: ConsultationStatus,
    gauze: MedicalSupply,
    patient: Patient,
}

impl Default for TestClinicBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClinicBuilder {
    /// Creates a builder with the standard fixtures
    pub fn new() -> Self {
        Self {
            consultation_status: ConsultationStatus::InProgress,
            gauze: CatalogFixtures::gauze(),
            patient: CatalogFixtures::patient(),
        }
    }

    /// Sets the status of the seeded consultation
    pub fn with_consultation_status(mut self, status: ConsultationStatus) -> Self {
        self.consultation_status = status;
        self
    }

    /// Sets the opening gauze stock
    pub fn with_gauze_stock(mut self, quantity: u32) -> Self {
        self.gauze = self.gauze.with_stock(quantity);
        self
    }

    /// Records allergy notes on the consultation's patient
    pub fn with_patient_allergies(mut self, allergies: impl Into<String>) -> Self {
        self.patient = self.patient.with_allergies(allergies);
        self
    }

    pub async fn build(self) -> TestClinic {
        let directory = Arc::new(InMemoryClinicDirectory::new());
        let doctor_id = StaffId::new_v7();

        let allergic_patient = CatalogFixtures::allergic_patient();
        let consultation = Consultation::new(self.patient.id, doctor_id, Utc::now())
            .with_status(self.consultation_status);
        let clinic = TestClinic {
            directory: directory.clone(),
            patient: self.patient,
            allergic_patient,
            doctor_id,
            consultation,
            dressing: CatalogFixtures::dressing(),
            injection: CatalogFixtures::injection(),
            gauze: self.gauze,
            suture_kit: CatalogFixtures::suture_kit(),
            paracetamol: CatalogFixtures::paracetamol(),
            amoxicillin: CatalogFixtures::amoxicillin(),
            blood_panel: CatalogFixtures::blood_panel(),
        };

        directory.upsert_patient(clinic.patient.clone()).await;
        directory.upsert_patient(clinic.allergic_patient.clone()).await;
        directory.upsert_consultation(clinic.consultation.clone()).await;
        directory.upsert_care(clinic.dressing.clone()).await;
        directory.upsert_care(clinic.injection.clone()).await;
        directory.upsert_supply(clinic.gauze.clone()).await;
        directory.upsert_supply(clinic.suture_kit.clone()).await;
        directory.upsert_medication(clinic.paracetamol.clone()).await;
        directory.upsert_medication(clinic.amoxicillin.clone()).await;
        directory.upsert_exam(clinic.blood_panel.clone()).await;

        clinic
    }
}
