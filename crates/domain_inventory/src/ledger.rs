//! Stock ledger implementation
//!
//! The ledger owns the on-hand count of every registered supply together
//! with the consumption records that explain it.
//!
//! # Invariants
//!
//! - `stock_quantity` never goes below zero: `consume` rejects, never clamps
//! - A consumption and its decrement are applied as one unit
//! - `reverse(consume(s, q))` restores the count and leaves no record
//!
//! Each supply's count and records sit behind their own mutex, so operations
//! on the same supply are serialized while different supplies proceed in
//! parallel. Lock waits are bounded by the ledger's timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    lock_within, ConsultationId, ConsultationSupplyId, Money, MoneyError, SupplyId, DEFAULT_LOCK_TIMEOUT,
};
use crate::alert::{check_low_stock, AlertPolicy, LowStockAlert};
use crate::consumption::{Consumption, ConsultationSupply};
use crate::error::StockError;
use crate::supply::MedicalSupply;

/// A supply together with the consumption records drawn against it
#[derive(Debug)]
struct SupplyEntry {
    supply: MedicalSupply,
    consumptions: HashMap<ConsultationSupplyId, ConsultationSupply>,
}

/// The ledger of medical supply stock
#[derive(Debug)]
pub struct StockLedger {
    entries: RwLock<HashMap<SupplyId, Arc<Mutex<SupplyEntry>>>>,
    /// Which supply each consumption record belongs to
    consumption_index: RwLock<HashMap<ConsultationSupplyId, SupplyId>>,
    alert_policy: AlertPolicy,
    lock_timeout: Duration,
}

impl Default for StockLedger {
    fn default() -> Self {
        Self::new(AlertPolicy::default(), DEFAULT_LOCK_TIMEOUT)
    }
}

impl StockLedger {
    /// Creates an empty ledger
    ///
    /// # Arguments
    ///
    /// * `alert_policy` - When consumptions raise low-stock alerts
    /// * `lock_timeout` - Bounded wait for a supply's lock
    pub fn new(alert_policy: AlertPolicy, lock_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            consumption_index: RwLock::new(HashMap::new()),
            alert_policy,
            lock_timeout,
        }
    }

    /// Returns the alert policy in force
    pub fn alert_policy(&self) -> AlertPolicy {
        self.alert_policy
    }

    /// Adds a supply to the ledger
    ///
    /// # Errors
    ///
    /// Returns `SupplyAlreadyRegistered` if the id is already tracked
    pub async fn register(&self, supply: MedicalSupply) -> Result<(), StockError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&supply.id) {
            return Err(StockError::SupplyAlreadyRegistered(supply.id.to_string()));
        }

        debug!(supply_id = %supply.id, stock = supply.stock_quantity, "Registering supply");
        entries.insert(
            supply.id,
            Arc::new(Mutex::new(SupplyEntry {
                supply,
                consumptions: HashMap::new(),
            })),
        );
        Ok(())
    }

    /// Returns the current state of a supply
    pub async fn supply(&self, id: SupplyId) -> Result<MedicalSupply, StockError> {
        let entry = self.lock_entry(id).await?;
        Ok(entry.supply.clone())
    }

    /// Returns every registered supply, ordered by name
    pub async fn supplies(&self) -> Result<Vec<MedicalSupply>, StockError> {
        let mut supplies = Vec::new();
        for id in self.supply_ids().await {
            supplies.push(self.supply(id).await?);
        }
        supplies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(supplies)
    }

    /// Takes `quantity` units of a supply for a consultation
    ///
    /// The record is priced at the supply's current unit price. The check,
    /// the decrement and the record creation happen under the supply's lock.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity` is zero
    /// - `SupplyNotFound` / `SupplyInactive` for unknown or deactivated supplies
    /// - `InsufficientStock` if `quantity` exceeds the on-hand count
    #[instrument(skip(self), fields(supply_id = %supply_id, consultation_id = %consultation_id))]
    pub async fn consume(
        &self,
        consultation_id: ConsultationId,
        supply_id: SupplyId,
        quantity: u32,
    ) -> Result<Consumption, StockError> {
        if quantity == 0 {
            return Err(StockError::InvalidQuantity(
                "consumed quantity must be greater than zero".to_string(),
            ));
        }

        let mut entry = self.lock_entry(supply_id).await?;

        if !entry.supply.is_active {
            return Err(StockError::SupplyInactive(supply_id.to_string()));
        }

        let before = entry.supply.stock_quantity;
        let after = before
            .checked_sub(quantity)
            .ok_or(StockError::InsufficientStock {
                supply_id,
                requested: quantity,
                available: before,
            })?;

        let record = ConsultationSupply::new(
            consultation_id,
            supply_id,
            quantity,
            entry.supply.unit_price,
        )?;

        entry.supply.stock_quantity = after;
        entry.supply.updated_at = Utc::now();
        entry.consumptions.insert(record.id, record.clone());
        self.consumption_index.write().await.insert(record.id, supply_id);

        let alert = if self
            .alert_policy
            .should_alert(before, after, entry.supply.min_stock_level)
        {
            check_low_stock(&entry.supply)
        } else {
            None
        };

        info!(quantity, before, after, record_id = %record.id, "Supply consumed");
        if let Some(alert) = &alert {
            warn!(
                supply = %alert.supply_name,
                stock = alert.stock_quantity,
                threshold = alert.min_stock_level,
                "Supply at or below minimum stock level"
            );
        }

        Ok(Consumption { record, alert })
    }

    /// Undoes a consumption: deletes the record and restores the stock
    ///
    /// # Errors
    ///
    /// Returns `ConsumptionNotFound` if the record does not exist or has
    /// already been reversed
    #[instrument(skip(self), fields(record_id = %consumption_id))]
    pub async fn reverse(
        &self,
        consumption_id: ConsultationSupplyId,
    ) -> Result<ConsultationSupply, StockError> {
        let supply_id = self
            .consumption_index
            .read()
            .await
            .get(&consumption_id)
            .copied()
            .ok_or_else(|| StockError::ConsumptionNotFound(consumption_id.to_string()))?;

        let mut entry = self.lock_entry(supply_id).await?;

        // Re-checked under the lock: a concurrent reverse may have won
        let quantity = entry
            .consumptions
            .get(&consumption_id)
            .map(|record| record.quantity)
            .ok_or_else(|| StockError::ConsumptionNotFound(consumption_id.to_string()))?;
        let restored = entry
            .supply
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| StockError::QuantityOverflow(supply_id.to_string()))?;

        let record = entry
            .consumptions
            .remove(&consumption_id)
            .ok_or_else(|| StockError::ConsumptionNotFound(consumption_id.to_string()))?;
        entry.supply.stock_quantity = restored;
        entry.supply.updated_at = Utc::now();
        self.consumption_index.write().await.remove(&consumption_id);

        info!(quantity, stock = restored, "Supply consumption reversed");
        Ok(record)
    }

    /// Adds delivered units to a supply's stock
    #[instrument(skip(self), fields(supply_id = %supply_id))]
    pub async fn restock(&self, supply_id: SupplyId, quantity: u32) -> Result<MedicalSupply, StockError> {
        if quantity == 0 {
            return Err(StockError::InvalidQuantity(
                "restocked quantity must be greater than zero".to_string(),
            ));
        }

        let mut entry = self.lock_entry(supply_id).await?;
        entry.supply.stock_quantity = entry
            .supply
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| StockError::QuantityOverflow(supply_id.to_string()))?;
        entry.supply.updated_at = Utc::now();

        info!(quantity, stock = entry.supply.stock_quantity, "Supply restocked");
        Ok(entry.supply.clone())
    }

    /// Changes the unit price charged for future consumptions
    ///
    /// Existing consumption records keep the price they were taken at.
    pub async fn reprice(&self, supply_id: SupplyId, unit_price: Money) -> Result<MedicalSupply, StockError> {
        if unit_price.is_negative() {
            return Err(StockError::Money(MoneyError::InvalidAmount(
                "unit price cannot be negative".to_string(),
            )));
        }

        let mut entry = self.lock_entry(supply_id).await?;
        entry.supply.unit_price = unit_price;
        entry.supply.updated_at = Utc::now();
        Ok(entry.supply.clone())
    }

    /// Activates or deactivates a supply
    pub async fn set_active(&self, supply_id: SupplyId, active: bool) -> Result<MedicalSupply, StockError> {
        let mut entry = self.lock_entry(supply_id).await?;
        entry.supply.is_active = active;
        entry.supply.updated_at = Utc::now();
        Ok(entry.supply.clone())
    }

    /// Returns a consumption record
    pub async fn consumption(
        &self,
        consumption_id: ConsultationSupplyId,
    ) -> Result<ConsultationSupply, StockError> {
        let supply_id = self
            .consumption_index
            .read()
            .await
            .get(&consumption_id)
            .copied()
            .ok_or_else(|| StockError::ConsumptionNotFound(consumption_id.to_string()))?;

        let entry = self.lock_entry(supply_id).await?;
        entry
            .consumptions
            .get(&consumption_id)
            .cloned()
            .ok_or_else(|| StockError::ConsumptionNotFound(consumption_id.to_string()))
    }

    /// Returns every live consumption record of a consultation, oldest first
    pub async fn consumptions_for(
        &self,
        consultation_id: ConsultationId,
    ) -> Result<Vec<ConsultationSupply>, StockError> {
        let mut records = Vec::new();
        for id in self.supply_ids().await {
            let entry = self.lock_entry(id).await?;
            records.extend(
                entry
                    .consumptions
                    .values()
                    .filter(|r| r.consultation_id == consultation_id)
                    .cloned(),
            );
        }
        records.sort_by_key(|r| (r.consumed_at, r.id));
        Ok(records)
    }

    /// Lists every supply currently at or below its alert threshold
    pub async fn low_stock_report(&self) -> Result<Vec<LowStockAlert>, StockError> {
        Ok(self
            .supplies()
            .await?
            .iter()
            .filter(|s| s.is_active)
            .filter_map(check_low_stock)
            .collect())
    }

    async fn supply_ids(&self) -> Vec<SupplyId> {
        self.entries.read().await.keys().copied().collect()
    }

    async fn lock_entry(&self, supply_id: SupplyId) -> Result<OwnedMutexGuard<SupplyEntry>, StockError> {
        let entry = self
            .entries
            .read()
            .await
            .get(&supply_id)
            .cloned()
            .ok_or_else(|| StockError::SupplyNotFound(supply_id.to_string()))?;

        Ok(lock_within(entry, self.lock_timeout, supply_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    async fn ledger_with(stock: u32, min: u32) -> (StockLedger, SupplyId) {
        let ledger = StockLedger::default();
        let supply = MedicalSupply::new(SupplyId::new(), "Syringe 5ml", Money::new(dec!(0.80), Currency::USD))
            .with_stock(stock)
            .with_min_stock_level(min);
        let id = supply.id;
        ledger.register(supply).await.unwrap();
        (ledger, id)
    }

    #[tokio::test]
    async fn test_consume_decrements_and_prices_record() {
        let (ledger, id) = ledger_with(50, 10).await;
        let consultation = ConsultationId::new();

        let consumption = ledger.consume(consultation, id, 5).await.unwrap();

        assert_eq!(consumption.record.quantity, 5);
        assert_eq!(consumption.record.total_price.amount(), dec!(4.00));
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 45);
        assert!(consumption.alert.is_none());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (ledger, id) = ledger_with(50, 10).await;
        let result = ledger.consume(ConsultationId::new(), id, 0).await;
        assert!(matches!(result, Err(StockError::InvalidQuantity(_))));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let (ledger, id) = ledger_with(1, 0).await;
        let again = MedicalSupply::new(id, "Syringe 5ml", Money::new(dec!(0.80), Currency::USD));
        assert!(matches!(
            ledger.register(again).await,
            Err(StockError::SupplyAlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn test_reverse_twice_fails_second_time() {
        let (ledger, id) = ledger_with(50, 10).await;
        let record = ledger.consume(ConsultationId::new(), id, 3).await.unwrap().record;

        ledger.reverse(record.id).await.unwrap();
        let second = ledger.reverse(record.id).await;

        assert!(matches!(second, Err(StockError::ConsumptionNotFound(_))));
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 50);
    }

    #[tokio::test]
    async fn test_lock_timeout_surfaces_as_error() {
        let ledger = StockLedger::new(AlertPolicy::OnCrossing, Duration::from_millis(10));
        let supply = MedicalSupply::new(SupplyId::new(), "Bandage", Money::new(dec!(1), Currency::USD))
            .with_stock(5);
        let id = supply.id;
        ledger.register(supply).await.unwrap();

        let _held = ledger.lock_entry(id).await.unwrap();
        let result = ledger.consume(ConsultationId::new(), id, 1).await;

        assert!(matches!(result, Err(StockError::LockTimeout(_))));
    }
}
