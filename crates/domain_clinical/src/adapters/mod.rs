//! Adapters for the clinical ports
//!
//! # Available Adapters
//!
//! - **InMemoryClinicDirectory**: keeps patients, catalog items and
//!   consultations in memory. Used by the replay tool and by tests.
//!
//! ```rust,ignore
//! use domain_clinical::adapters::InMemoryClinicDirectory;
//! use domain_clinical::{CatalogPort, ConsultationPort};
//! use std::sync::Arc;
//!
//! let directory = Arc::new(InMemoryClinicDirectory::new());
//! let catalog: Arc<dyn CatalogPort> = directory.clone();
//! let consultations: Arc<dyn ConsultationPort> = directory;
//! ```

pub mod memory;

pub use memory::InMemoryClinicDirectory;
