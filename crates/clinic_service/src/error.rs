//! Service error handling

use serde::Serialize;
use thiserror::Error;

use core_kernel::{PortError, UserRole};
use domain_billing::BillingError;
use domain_clinical::ClinicalError;
use domain_inventory::StockError;

/// Service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Clinical(#[from] ClinicalError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] PortError),

    #[error("Forbidden: a {role} cannot {action}")]
    Forbidden {
        role: UserRole,
        action: &'static str,
    },

    /// The consultation is cancelled or already invoiced
    #[error("Consultation {consultation_id} is closed for editing: {reason}")]
    ConsultationClosed {
        consultation_id: String,
        reason: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-readable error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    /// True when retrying with an explicit acknowledgment would succeed
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub acknowledgeable: bool,
}

impl ServiceError {
    /// Stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Stock(e) => match e {
                StockError::InsufficientStock { .. } => "insufficient_stock",
                StockError::SupplyNotFound(_) | StockError::ConsumptionNotFound(_) => "not_found",
                StockError::SupplyInactive(_) => "supply_inactive",
                StockError::LockTimeout(_) => "lock_timeout",
                _ => "invalid_stock_operation",
            },
            ServiceError::Clinical(e) => match e {
                ClinicalError::AllergyFlagged { .. } => "allergy_flagged",
                ClinicalError::PrescriptionExpired { .. } => "prescription_expired",
                ClinicalError::PrescriptionAlreadyExists(_) => "prescription_already_exists",
                ClinicalError::CareRecordNotFound(_) | ClinicalError::PrescriptionNotFound(_) => "not_found",
                ClinicalError::Catalog(p) if p.is_not_found() => "not_found",
                ClinicalError::InvalidStatusTransition { .. } => "invalid_status_transition",
                _ => "invalid_clinical_record",
            },
            ServiceError::Billing(e) => match e {
                BillingError::DuplicateInvoice { .. } => "duplicate_invoice",
                BillingError::InvoiceNotEditable { .. } => "invoice_not_editable",
                BillingError::InvoiceNotPayable { .. } => "invoice_not_payable",
                BillingError::InvalidStatusTransition { .. } => "invalid_status_transition",
                BillingError::InvoiceNotFound(_) => "not_found",
                BillingError::Catalog(p) if p.is_not_found() => "not_found",
                BillingError::ConsultationCancelled(_) => "consultation_closed",
                BillingError::LockTimeout(_) => "lock_timeout",
                BillingError::Clinical(ClinicalError::InvalidStatusTransition { .. }) => "invalid_status_transition",
                _ => "invalid_billing_operation",
            },
            ServiceError::Catalog(p) if p.is_not_found() => "not_found",
            ServiceError::Catalog(_) => "catalog_unavailable",
            ServiceError::Forbidden { .. } => "forbidden",
            ServiceError::ConsultationClosed { .. } => "consultation_closed",
            ServiceError::Config(_) => "configuration",
            ServiceError::Telemetry(_) => "telemetry",
            ServiceError::Serialization(_) => "invalid_command",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
            acknowledgeable: matches!(self, ServiceError::Clinical(e) if e.is_acknowledgeable()),
        }
    }
}
