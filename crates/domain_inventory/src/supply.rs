//! Medical supplies
//!
//! A supply is both a catalog entry (name, price) and an inventory position
//! (on-hand count, alert threshold). Only the stock ledger mutates the count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Money, SupplyId};

/// A consumable medical supply held in stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalSupply {
    /// Catalog identifier
    pub id: SupplyId,
    /// Display name
    pub name: String,
    /// Unit of issue (e.g. "box", "piece")
    pub unit: String,
    /// Current unit price
    pub unit_price: Money,
    /// Current on-hand count
    pub stock_quantity: u32,
    /// Alert threshold
    pub min_stock_level: u32,
    /// Inactive supplies cannot be consumed
    pub is_active: bool,
    /// Last time the count or flags changed
    pub updated_at: DateTime<Utc>,
}

impl MedicalSupply {
    /// Creates an active supply with no stock
    ///
    /// # Arguments
    ///
    /// * `id` - Catalog identifier of the supply
    /// * `name` - Display name
    /// * `unit_price` - Price charged per unit
    pub fn new(id: SupplyId, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            unit: "piece".to_string(),
            unit_price,
            stock_quantity: 0,
            min_stock_level: 0,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    /// Sets the unit of issue
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets the opening stock count
    pub fn with_stock(mut self, quantity: u32) -> Self {
        self.stock_quantity = quantity;
        self
    }

    /// Sets the low-stock alert threshold
    pub fn with_min_stock_level(mut self, level: u32) -> Self {
        self.min_stock_level = level;
        self
    }

    /// Marks the supply inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns true if `requested` units can be taken from stock
    pub fn has_enough_stock(&self, requested: u32) -> bool {
        self.stock_quantity >= requested
    }

    /// Returns true if the count is at or below the alert threshold
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn gauze() -> MedicalSupply {
        MedicalSupply::new(SupplyId::new(), "Sterile gauze", Money::new(dec!(2.50), Currency::USD))
            .with_unit("pack")
            .with_stock(50)
            .with_min_stock_level(10)
    }

    #[test]
    fn test_has_enough_stock_is_inclusive() {
        let supply = gauze();
        assert!(supply.has_enough_stock(50));
        assert!(!supply.has_enough_stock(51));
    }

    #[test]
    fn test_low_stock_at_threshold() {
        let supply = gauze().with_stock(10);
        assert!(supply.is_low_stock());
        assert!(!gauze().with_stock(11).is_low_stock());
    }
}
