//! Tests for the stock ledger
//!
//! Covers the consume/reverse contract, alert policies, the non-negative
//! stock invariant under arbitrary operation sequences, and serialization of
//! concurrent consumptions against the same supply.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use core_kernel::{ConsultationId, Currency, Money, SupplyId};
use domain_inventory::{AlertPolicy, MedicalSupply, StockError, StockLedger};

async fn ledger_with_supply(policy: AlertPolicy, stock: u32, min: u32) -> (StockLedger, SupplyId) {
    let ledger = StockLedger::new(policy, Duration::from_secs(2));
    let supply = MedicalSupply::new(
        SupplyId::new(),
        "Nitrile gloves",
        Money::new(dec!(0.35), Currency::USD),
    )
    .with_unit("pair")
    .with_stock(stock)
    .with_min_stock_level(min);
    let id = supply.id;
    ledger.register(supply).await.unwrap();
    (ledger, id)
}

// ============================================================================
// Consume / reverse
// ============================================================================

mod consume_reverse {
    use super::*;

    #[tokio::test]
    async fn test_low_stock_scenario() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 50, 10).await;
        let consultation = ConsultationId::new();

        // 50 -> 5 crosses the threshold of 10
        let consumption = ledger.consume(consultation, id, 45).await.unwrap();
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 5);
        let alert = consumption.alert.expect("crossing should raise an alert");
        assert_eq!(alert.stock_quantity, 5);
        assert_eq!(alert.min_stock_level, 10);

        // Reversal restores 50 and raises nothing
        let reversed = ledger.reverse(consumption.record.id).await.unwrap();
        assert_eq!(reversed.quantity, 45);
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 50);

        // Over-consumption is rejected and leaves the count alone
        let result = ledger.consume(consultation, id, 60).await;
        assert!(matches!(
            result,
            Err(StockError::InsufficientStock { requested: 60, available: 50, .. })
        ));
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 50);
        assert!(ledger.consumptions_for(consultation).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_consuming_entire_stock_is_allowed() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 7, 0).await;

        let consumption = ledger.consume(ConsultationId::new(), id, 7).await.unwrap();

        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 0);
        assert!(consumption.alert.is_some());
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_price_change() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 20, 0).await;
        let consultation = ConsultationId::new();
        let record = ledger.consume(consultation, id, 4).await.unwrap().record;

        ledger.reprice(id, Money::new(dec!(0.50), Currency::USD)).await.unwrap();

        let stored = ledger.consumption(record.id).await.unwrap();
        assert_eq!(stored.unit_price.amount(), dec!(0.35));
        assert_eq!(stored.total_price.amount(), dec!(1.40));

        let next = ledger.consume(consultation, id, 1).await.unwrap().record;
        assert_eq!(next.unit_price.amount(), dec!(0.50));
    }

    #[tokio::test]
    async fn test_inactive_supply_cannot_be_consumed_but_can_be_reversed() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 20, 0).await;
        let record = ledger.consume(ConsultationId::new(), id, 4).await.unwrap().record;

        ledger.set_active(id, false).await.unwrap();

        let result = ledger.consume(ConsultationId::new(), id, 1).await;
        assert!(matches!(result, Err(StockError::SupplyInactive(_))));

        ledger.reverse(record.id).await.unwrap();
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 20);
    }

    #[tokio::test]
    async fn test_unknown_supply() {
        let ledger = StockLedger::default();
        let result = ledger.consume(ConsultationId::new(), SupplyId::new(), 1).await;
        assert!(matches!(result, Err(StockError::SupplyNotFound(_))));
    }

    #[tokio::test]
    async fn test_consumptions_for_filters_by_consultation() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 20, 0).await;
        let first = ConsultationId::new();
        let second = ConsultationId::new();

        ledger.consume(first, id, 1).await.unwrap();
        ledger.consume(second, id, 2).await.unwrap();
        ledger.consume(first, id, 3).await.unwrap();

        let records = ledger.consumptions_for(first).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.consultation_id == first));
    }

    #[tokio::test]
    async fn test_restock_adds_units() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 3, 10).await;

        let supply = ledger.restock(id, 40).await.unwrap();

        assert_eq!(supply.stock_quantity, 43);
        assert!(ledger.low_stock_report().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reverse_overflow_leaves_record_in_place() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 10, 0).await;
        let record = ledger.consume(ConsultationId::new(), id, 10).await.unwrap().record;
        ledger.restock(id, u32::MAX).await.unwrap();

        let result = ledger.reverse(record.id).await;

        assert!(matches!(result, Err(StockError::QuantityOverflow(_))));
        assert!(ledger.consumption(record.id).await.is_ok());
    }
}

// ============================================================================
// Alert policies
// ============================================================================

mod alerts {
    use super::*;

    #[tokio::test]
    async fn test_on_crossing_alerts_only_once_below_threshold() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 12, 10).await;
        let consultation = ConsultationId::new();

        let crossing = ledger.consume(consultation, id, 3).await.unwrap();
        let below = ledger.consume(consultation, id, 1).await.unwrap();

        assert!(crossing.alert.is_some());
        assert!(below.alert.is_none());
    }

    #[tokio::test]
    async fn test_while_below_alerts_on_every_consumption() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::WhileBelow, 12, 10).await;
        let consultation = ConsultationId::new();

        let crossing = ledger.consume(consultation, id, 3).await.unwrap();
        let below = ledger.consume(consultation, id, 1).await.unwrap();

        assert!(crossing.alert.is_some());
        assert_eq!(below.alert.map(|a| a.stock_quantity), Some(8));
    }

    #[tokio::test]
    async fn test_on_crossing_fires_again_after_recovery() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 12, 10).await;
        let consultation = ConsultationId::new();

        let first = ledger.consume(consultation, id, 5).await.unwrap();
        ledger.restock(id, 10).await.unwrap();
        let second = ledger.consume(consultation, id, 8).await.unwrap();

        assert!(first.alert.is_some());
        assert!(second.alert.is_some());
    }

    #[tokio::test]
    async fn test_low_stock_report_lists_supplies_at_threshold() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 10, 10).await;
        let healthy = MedicalSupply::new(SupplyId::new(), "Cotton", Money::new(dec!(1), Currency::USD))
            .with_stock(100)
            .with_min_stock_level(10);
        ledger.register(healthy).await.unwrap();

        let report = ledger.low_stock_report().await.unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].supply_id, id);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumptions_never_oversell() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 10, 0).await;
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.consume(ConsultationId::new(), id, 1).await })
            })
            .collect();

        let mut successes = 0;
        let mut rejections = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StockError::InsufficientStock { .. }) => rejections += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 10);
        assert_eq!(rejections, 15);
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reversals_restore_exactly_once() {
        let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, 10, 0).await;
        let ledger = Arc::new(ledger);
        let record = ledger.consume(ConsultationId::new(), id, 6).await.unwrap().record;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let record_id = record.id;
                tokio::spawn(async move { ledger.reverse(record_id).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, 10);
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Consume(u32),
        /// Reverse the n-th live record (modulo the number of live records)
        Reverse(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..40u32).prop_map(Op::Consume),
            (0usize..16usize).prop_map(Op::Reverse),
        ]
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn stock_never_goes_negative(
            initial in 0u32..100u32,
            ops in proptest::collection::vec(op_strategy(), 1..40)
        ) {
            runtime().block_on(async {
                let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, initial, 5).await;
                let consultation = ConsultationId::new();
                let mut live = Vec::new();
                let mut expected = initial;

                for op in ops {
                    match op {
                        Op::Consume(q) => {
                            match ledger.consume(consultation, id, q).await {
                                Ok(c) => {
                                    prop_assert!(q <= expected);
                                    expected -= q;
                                    live.push(c.record);
                                }
                                Err(StockError::InsufficientStock { .. }) => {
                                    prop_assert!(q > expected);
                                }
                                Err(other) => prop_assert!(false, "unexpected error: {}", other),
                            }
                        }
                        Op::Reverse(n) => {
                            if !live.is_empty() {
                                let record = live.remove(n % live.len());
                                ledger.reverse(record.id).await.unwrap();
                                expected += record.quantity;
                            }
                        }
                    }
                    let stock = ledger.supply(id).await.unwrap().stock_quantity;
                    prop_assert_eq!(stock, expected);
                }
                Ok(())
            })?;
        }

        #[test]
        fn reverse_is_exact_inverse_of_consume(q in 0u32..500u32, n_frac in 0u32..=100u32) {
            let n = ((q as u64 * n_frac as u64) / 100) as u32;
            prop_assume!(n > 0);

            runtime().block_on(async {
                let (ledger, id) = ledger_with_supply(AlertPolicy::OnCrossing, q, 0).await;
                let consultation = ConsultationId::new();

                let record = ledger.consume(consultation, id, n).await.unwrap().record;
                ledger.reverse(record.id).await.unwrap();

                prop_assert_eq!(ledger.supply(id).await.unwrap().stock_quantity, q);
                prop_assert!(ledger.consumptions_for(consultation).await.unwrap().is_empty());
                Ok(())
            })?;
        }
    }
}
