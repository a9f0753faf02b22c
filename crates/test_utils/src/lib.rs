//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! clinic billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built catalog entries, staff and dates
//! - `builders`: Seeded in-memory clinic directories
//! - `assertions`: Custom assertion helpers for money and invoices
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
