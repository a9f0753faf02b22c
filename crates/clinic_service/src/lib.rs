//! Clinic Billing Service
//!
//! This crate exposes the billing and inventory core as one service:
//!
//! - **service**: the operation surface (`ClinicService`)
//! - **config**: `CLINIC_*` environment configuration
//! - **telemetry**: tracing subscriber setup
//! - **replay**: runs a JSON command script against a seeded service
//!
//! # Example
//!
//! ```rust,ignore
//! use clinic_service::{ClinicService, ServiceConfig, Actor};
//!
//! let config = ServiceConfig::from_env()?;
//! let service = ClinicService::with_directory(directory, &config)?;
//!
//! let invoice = service.create_invoice(&cashier, consultation_id).await?;
//! service
//!     .record_payment(&cashier, invoice.id, invoice.total, PaymentMethod::Cash, None, None)
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;
pub mod replay;

pub use config::{LogFormat, ServiceConfig};
pub use error::{ErrorBody, ServiceError};
pub use service::{Actor, ClinicService};
pub use telemetry::init_tracing;
pub use replay::{Command, Replay, Seed, StepOutcome};
