//! Staff roles
//!
//! Roles gate which records a staff member may edit. The gates themselves
//! live next to the records they protect (`domain_clinical::validation`,
//! `domain_billing::invoice`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    Cashier,
}

impl UserRole {
    /// Returns true for roles that handle money
    pub fn is_billing_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Cashier)
    }

    /// Returns true for roles that deliver care
    pub fn is_clinical_staff(&self) -> bool {
        matches!(self, UserRole::Doctor | UserRole::Nurse)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserRole::Admin => "admin",
            UserRole::Doctor => "doctor",
            UserRole::Nurse => "nurse",
            UserRole::Receptionist => "receptionist",
            UserRole::Cashier => "cashier",
        };
        f.write_str(name)
    }
}
