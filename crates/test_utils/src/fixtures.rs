//! Pre-built Test Fixtures
//!
//! Provides ready-to-use catalog entries, staff and dates. Prices are the
//! ones the reference scenarios are written against: a 100.00 consultation
//! fee, a 45.00 dressing and 2.50 gauze packs.

use chrono::{Days, NaiveDate, Utc};
use core_kernel::{
    CareId, Currency, ExamId, MedicationId, Money, PatientId, StaffId, SupplyId, UserRole,
};
use domain_clinical::{MedicalCare, MedicalExam, Medication, Patient};
use domain_inventory::MedicalSupply;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A USD amount
    pub fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    /// The default consultation fee
    pub fn consultation_fee() -> Money {
        Self::usd(dec!(100.00))
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }
}

/// Fixture for calendar dates
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// A validity date that is still open for a week
    pub fn next_week() -> NaiveDate {
        Self::today() + Days::new(7)
    }

    /// One day after the default payment terms run out
    pub fn past_default_terms() -> NaiveDate {
        Self::today() + Days::new(31)
    }
}

/// Fixture for catalog entries
pub struct CatalogFixtures;

impl CatalogFixtures {
    pub fn patient() -> Patient {
        Patient::new(PatientId::new_v7(), "Jane", "Doe")
    }

    /// A patient whose intake notes mention amoxicillin
    pub fn allergic_patient() -> Patient {
        Patient::new(PatientId::new_v7(), "John", "Smith").with_allergies("Amoxicillin, latex")
    }

    pub fn dressing() -> MedicalCare {
        MedicalCare::new(CareId::new_v7(), "Wound dressing", MoneyFixtures::usd(dec!(45.00)))
            .with_description("Cleaning and dressing of a wound")
    }

    pub fn injection() -> MedicalCare {
        MedicalCare::new(CareId::new_v7(), "Intramuscular injection", MoneyFixtures::usd(dec!(15.00)))
    }

    /// 50 packs on hand, alert at 10
    pub fn gauze() -> MedicalSupply {
        MedicalSupply::new(SupplyId::new_v7(), "Sterile gauze", MoneyFixtures::usd(dec!(2.50)))
            .with_unit("pack")
            .with_stock(50)
            .with_min_stock_level(10)
    }

    /// A scarce supply: 3 on hand, alert at 2
    pub fn suture_kit() -> MedicalSupply {
        MedicalSupply::new(SupplyId::new_v7(), "Suture kit", MoneyFixtures::usd(dec!(12.00)))
            .with_unit("kit")
            .with_stock(3)
            .with_min_stock_level(2)
    }

    pub fn paracetamol() -> Medication {
        Medication::new(MedicationId::new_v7(), "Doliprane", "Paracetamol", MoneyFixtures::usd(dec!(3.20)))
    }

    /// Matches the allergic patient's notes
    pub fn amoxicillin() -> Medication {
        Medication::new(
            MedicationId::new_v7(),
            "Clamoxyl",
            "Amoxicillin",
            MoneyFixtures::usd(dec!(8.75)),
        )
    }

    pub fn blood_panel() -> MedicalExam {
        MedicalExam::new(ExamId::new_v7(), "Blood panel", MoneyFixtures::usd(dec!(60.00)))
    }
}

/// Fixture for staff members
pub struct StaffFixtures;

impl StaffFixtures {
    pub fn doctor() -> (StaffId, UserRole) {
        (StaffId::new_v7(), UserRole::Doctor)
    }

    pub fn nurse() -> (StaffId, UserRole) {
        (StaffId::new_v7(), UserRole::Nurse)
    }

    pub fn cashier() -> (StaffId, UserRole) {
        (StaffId::new_v7(), UserRole::Cashier)
    }

    pub fn receptionist() -> (StaffId, UserRole) {
        (StaffId::new_v7(), UserRole::Receptionist)
    }

    pub fn admin() -> (StaffId, UserRole) {
        (StaffId::new_v7(), UserRole::Admin)
    }
}
