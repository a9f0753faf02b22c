//! Ports for external collaborators
//!
//! The billing core reads reference data (patients, medications, exams,
//! cares, supplies, consultations) that it does not own. Each domain defines
//! the port traits it needs; this module provides the error type every port
//! implementation returns and the marker trait they all extend.
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait CatalogPort: DomainPort {
//!     async fn get_medical_care(&self, id: CareId) -> Result<MedicalCare, PortError>;
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Error type for port operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The data returned by the collaborator is unusable
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// The collaborator is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker trait for all domain ports
///
/// Ports are shared across tasks behind `Arc<dyn ...>`.
pub trait DomainPort: Send + Sync + 'static {}
