//! Integration tests for the clinical domain

use std::sync::Arc;

use chrono::{Days, Utc};
use rust_decimal_macros::dec;

use core_kernel::{CareId, ConsultationId, Currency, ExamId, MedicationId, Money, PatientId, StaffId};
use domain_clinical::*;

struct Fixture {
    directory: Arc<InMemoryClinicDirectory>,
    patient: Patient,
    medication: Medication,
    exam: MedicalExam,
    care: MedicalCare,
}

async fn fixture(allergies: Option<&str>) -> Fixture {
    let directory = Arc::new(InMemoryClinicDirectory::new());

    let mut patient = Patient::new(PatientId::new_v7(), "Maria", "Silva");
    if let Some(allergies) = allergies {
        patient = patient.with_allergies(allergies);
    }
    let medication = Medication::new(
        MedicationId::new_v7(),
        "Augmentin",
        "Amoxicillin",
        Money::new(dec!(8.75), Currency::USD),
    );
    let exam = MedicalExam::new(ExamId::new_v7(), "Blood panel", Money::new(dec!(60), Currency::USD));
    let care = MedicalCare::new(CareId::new_v7(), "Wound dressing", Money::new(dec!(45), Currency::USD));

    directory.upsert_patient(patient.clone()).await;
    directory.upsert_medication(medication.clone()).await;
    directory.upsert_exam(exam.clone()).await;
    directory.upsert_care(care.clone()).await;

    Fixture { directory, patient, medication, exam, care }
}

fn request(f: &Fixture, consultation_id: ConsultationId) -> NewPrescription {
    NewPrescription {
        consultation_id,
        patient_id: f.patient.id,
        doctor_id: StaffId::new_v7(),
        valid_until: Utc::now().date_naive() + Days::new(10),
        items: vec![
            NewPrescriptionItem {
                kind: PrescribedItemKind::Medication(f.medication.id),
                quantity: 2,
                instructions: Some("twice daily".to_string()),
            },
            NewPrescriptionItem {
                kind: PrescribedItemKind::Exam(f.exam.id),
                quantity: 1,
                instructions: None,
            },
        ],
        notes: None,
    }
}

mod prescriptions {
    use super::*;

    #[tokio::test]
    async fn test_register_prices_items_from_catalog() {
        let f = fixture(None).await;
        let registry = PrescriptionRegistry::new(f.directory.clone());

        let prescription = registry.register(request(&f, ConsultationId::new_v7()), false).await.unwrap();

        assert_eq!(prescription.status, PrescriptionStatus::Active);
        assert_eq!(prescription.items.len(), 2);
        assert_eq!(prescription.items[0].total_price, Money::new(dec!(17.50), Currency::USD));
        assert_eq!(prescription.items[1].unit_price, Money::new(dec!(60), Currency::USD));
        assert!(prescription.acknowledged_warnings.is_empty());
    }

    #[tokio::test]
    async fn test_allergy_flag_is_a_confirm_gate() {
        let f = fixture(Some("amoxicillin")).await;
        let registry = PrescriptionRegistry::new(f.directory.clone());
        let consultation_id = ConsultationId::new_v7();

        let err = registry.register(request(&f, consultation_id), false).await.unwrap_err();
        assert!(matches!(err, ClinicalError::AllergyFlagged { .. }));
        assert!(registry.billable_for_consultation(consultation_id).await.is_none());

        let prescription = registry.register(request(&f, consultation_id), true).await.unwrap();
        assert_eq!(prescription.acknowledged_warnings.len(), 1);
        assert_eq!(prescription.acknowledged_warnings[0].medication_id, f.medication.id);
    }

    #[tokio::test]
    async fn test_one_open_prescription_per_consultation() {
        let f = fixture(None).await;
        let registry = PrescriptionRegistry::new(f.directory.clone());
        let consultation_id = ConsultationId::new_v7();

        let first = registry.register(request(&f, consultation_id), false).await.unwrap();
        let err = registry.register(request(&f, consultation_id), false).await.unwrap_err();
        assert!(matches!(err, ClinicalError::PrescriptionAlreadyExists(_)));

        registry.cancel(first.id).await.unwrap();
        assert!(registry.register(request(&f, consultation_id), false).await.is_ok());
    }

    #[tokio::test]
    async fn test_complete_on_expiry_day_fails() {
        let f = fixture(None).await;
        let registry = PrescriptionRegistry::new(f.directory.clone());
        let prescription = registry.register(request(&f, ConsultationId::new_v7()), false).await.unwrap();

        let err = registry.complete(prescription.id, prescription.valid_until).await.unwrap_err();
        assert!(matches!(err, ClinicalError::PrescriptionExpired { .. }));
        assert_eq!(registry.get(prescription.id).await.unwrap().status, PrescriptionStatus::Active);

        let completed = registry.complete(prescription.id, Utc::now().date_naive()).await.unwrap();
        assert_eq!(completed.status, PrescriptionStatus::Completed);
    }

    #[tokio::test]
    async fn test_billed_prescription_is_not_billable_again() {
        let f = fixture(None).await;
        let registry = PrescriptionRegistry::new(f.directory.clone());
        let consultation_id = ConsultationId::new_v7();
        let prescription = registry.register(request(&f, consultation_id), false).await.unwrap();

        registry.mark_billed(prescription.id).await.unwrap();

        assert!(registry.billable_for_consultation(consultation_id).await.is_none());
        assert!(registry.mark_billed(prescription.id).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_empty_or_expired_requests() {
        let f = fixture(None).await;
        let registry = PrescriptionRegistry::new(f.directory.clone());

        let mut empty = request(&f, ConsultationId::new_v7());
        empty.items.clear();
        assert!(matches!(
            registry.register(empty, false).await,
            Err(ClinicalError::InvalidPrescription(_))
        ));

        let mut stale = request(&f, ConsultationId::new_v7());
        stale.valid_until = Utc::now().date_naive();
        assert!(matches!(
            registry.register(stale, false).await,
            Err(ClinicalError::InvalidPrescription(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_medication_rejected() {
        let f = fixture(None).await;
        let registry = PrescriptionRegistry::new(f.directory.clone());

        let mut unknown = request(&f, ConsultationId::new_v7());
        unknown.items[0].kind = PrescribedItemKind::Medication(MedicationId::new_v7());

        let err = registry.register(unknown, false).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Catalog(e) if e.is_not_found()));
    }
}

mod cares {
    use super::*;

    #[tokio::test]
    async fn test_cares_listed_per_consultation() {
        let f = fixture(None).await;
        let register = CareRegister::new(f.directory.clone());
        let consultation_id = ConsultationId::new_v7();

        register
            .add_care(consultation_id, NewConsultationCare::new(f.care.id, 1))
            .await
            .unwrap();
        register
            .add_care(ConsultationId::new_v7(), NewConsultationCare::new(f.care.id, 2))
            .await
            .unwrap();

        let cares = register.list_for_consultation(consultation_id).await;
        assert_eq!(cares.len(), 1);
        assert_eq!(cares[0].total_price, Money::new(dec!(45), Currency::USD));
    }
}
