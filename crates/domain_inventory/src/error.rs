//! Inventory domain errors

use core_kernel::{LockTimeout, MoneyError, SupplyId};
use thiserror::Error;

/// Errors that can occur in the inventory domain
///
/// Every variant is returned before any state is touched: a rejected
/// operation leaves stock counts and consumption records unchanged.
#[derive(Debug, Error)]
pub enum StockError {
    /// Supply not found
    #[error("Supply not found: {0}")]
    SupplyNotFound(String),

    /// Supply already registered
    #[error("Supply already registered: {0}")]
    SupplyAlreadyRegistered(String),

    /// Supply has been deactivated
    #[error("Supply is inactive: {0}")]
    SupplyInactive(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Not enough stock on hand for the requested consumption
    #[error("Insufficient stock for {supply_id}: requested {requested}, available {available}")]
    InsufficientStock {
        supply_id: SupplyId,
        requested: u32,
        available: u32,
    },

    /// Consumption record not found (never created, or already reversed)
    #[error("Consumption record not found: {0}")]
    ConsumptionNotFound(String),

    /// Restoring stock would exceed the representable count
    #[error("Stock quantity overflow for supply {0}")]
    QuantityOverflow(String),

    /// The supply's lock could not be acquired in time
    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),

    /// Price calculation error
    #[error("Calculation error: {0}")]
    Money(#[from] MoneyError),
}
