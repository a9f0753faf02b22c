//! Core Kernel - Foundational types for the clinic billing core
//!
//! This crate provides the building blocks shared by the inventory, clinical
//! and billing domains:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Staff roles
//! - Bounded-wait keyed locks used to serialize mutations per entity
//! - The error type returned by ports to external collaborators

pub mod money;
pub mod identifiers;
pub mod roles;
pub mod sync;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{
    PatientId, MedicationId, ExamId, CareId, SupplyId,
    ConsultationId, ConsultationCareId, ConsultationSupplyId,
    PrescriptionId, PrescriptionItemId, StaffId,
    InvoiceId, InvoiceItemId, PaymentId,
};
pub use roles::UserRole;
pub use sync::{KeyedLocks, KeyedGuard, LockTimeout, lock_within, DEFAULT_LOCK_TIMEOUT};
pub use ports::{PortError, DomainPort};
