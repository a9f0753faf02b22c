//! Inventory Domain - Medical Supply Stock Ledger
//!
//! This crate tracks the on-hand count of consumable medical supplies as they
//! are attached to and detached from consultations.
//!
//! # Stock Rules
//!
//! - Counts are unsigned and a consumption larger than the stock is rejected
//! - Consuming creates a priced [`ConsultationSupply`] record; reversing it
//!   deletes the record and gives the units back
//! - A consumption that brings a supply to or below its minimum level raises
//!   a [`LowStockAlert`] according to the ledger's [`AlertPolicy`]
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_inventory::{StockLedger, MedicalSupply};
//!
//! let ledger = StockLedger::default();
//! ledger.register(MedicalSupply::new(id, "Gauze", price).with_stock(50)).await?;
//!
//! let consumption = ledger.consume(consultation_id, id, 5).await?;
//! ledger.reverse(consumption.record.id).await?;
//! ```

pub mod supply;
pub mod consumption;
pub mod alert;
pub mod ledger;
pub mod error;

pub use supply::MedicalSupply;
pub use consumption::{ConsultationSupply, Consumption};
pub use alert::{AlertPolicy, LowStockAlert, check_low_stock};
pub use ledger::StockLedger;
pub use error::StockError;
