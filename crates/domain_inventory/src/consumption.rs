//! Supply consumption records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ConsultationId, ConsultationSupplyId, Money, MoneyError, SupplyId};
use crate::alert::LowStockAlert;

/// A supply used during a consultation
///
/// The unit price is a snapshot taken at consumption time; later changes to
/// the supply's price do not affect the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationSupply {
    pub id: ConsultationSupplyId,
    pub consultation_id: ConsultationId,
    pub supply_id: SupplyId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub consumed_at: DateTime<Utc>,
}

impl ConsultationSupply {
    /// Creates a record, computing `total_price = quantity × unit_price`
    pub fn new(
        consultation_id: ConsultationId,
        supply_id: SupplyId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, MoneyError> {
        Ok(Self {
            id: ConsultationSupplyId::new_v7(),
            consultation_id,
            supply_id,
            quantity,
            unit_price,
            total_price: unit_price.times(quantity)?,
            consumed_at: Utc::now(),
        })
    }
}

/// Outcome of a successful consumption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consumption {
    /// The record that was created
    pub record: ConsultationSupply,
    /// Alert raised by this consumption, per the ledger's alert policy
    pub alert: Option<LowStockAlert>,
}
