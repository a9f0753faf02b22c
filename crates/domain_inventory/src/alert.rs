//! Low-stock alerts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::SupplyId;
use crate::supply::MedicalSupply;

/// A supply is at or below its alert threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub supply_id: SupplyId,
    pub supply_name: String,
    pub stock_quantity: u32,
    pub min_stock_level: u32,
    pub raised_at: DateTime<Utc>,
}

/// When a consumption raises a low-stock alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Only the consumption that takes the count from above the threshold
    /// to at-or-below it raises an alert
    #[default]
    OnCrossing,
    /// Every consumption that leaves the count at or below the threshold
    /// raises an alert
    WhileBelow,
}

impl AlertPolicy {
    /// Decides whether a consumption moving the count from `before` to
    /// `after` raises an alert against `threshold`
    pub fn should_alert(&self, before: u32, after: u32, threshold: u32) -> bool {
        match self {
            AlertPolicy::OnCrossing => before > threshold && after <= threshold,
            AlertPolicy::WhileBelow => after <= threshold,
        }
    }
}

/// Returns an alert exactly when the supply is at or below its threshold
pub fn check_low_stock(supply: &MedicalSupply) -> Option<LowStockAlert> {
    supply.is_low_stock().then(|| LowStockAlert {
        supply_id: supply.id,
        supply_name: supply.name.clone(),
        stock_quantity: supply.stock_quantity,
        min_stock_level: supply.min_stock_level,
        raised_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_crossing_fires_once() {
        let policy = AlertPolicy::OnCrossing;
        assert!(policy.should_alert(50, 5, 10));
        assert!(!policy.should_alert(5, 3, 10));
        assert!(!policy.should_alert(50, 11, 10));
    }

    #[test]
    fn test_crossing_onto_threshold_counts() {
        assert!(AlertPolicy::OnCrossing.should_alert(11, 10, 10));
    }

    #[test]
    fn test_while_below_fires_every_time() {
        let policy = AlertPolicy::WhileBelow;
        assert!(policy.should_alert(50, 5, 10));
        assert!(policy.should_alert(5, 3, 10));
        assert!(!policy.should_alert(50, 11, 10));
    }

    #[test]
    fn test_policy_serializes_snake_case() {
        let json = serde_json::to_string(&AlertPolicy::WhileBelow).unwrap();
        assert_eq!(json, "\"while_below\"");
    }
}
