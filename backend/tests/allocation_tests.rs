//! Stock allocation tests
//!
//! Covers the FIFO depletion order, conservation of allocated quantity, and
//! shortfall reporting when stock runs out.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::models::{plan_fifo_allocation, PartStock};

fn stock_at(quantity: i32, minutes_after_epoch: i64) -> PartStock {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    PartStock {
        part_id: Uuid::new_v4(),
        quantity,
        created_at: base + Duration::minutes(minutes_after_epoch),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two part rows [3, 5] created at t1 < t2, order for 4: the older row
    /// empties before the newer row is touched.
    #[test]
    fn test_fifo_depletes_oldest_first() {
        let older = stock_at(3, 0);
        let newer = stock_at(5, 60);

        // Deliberately passed newest-first; the planner orders by age.
        let plan = plan_fifo_allocation(&[newer.clone(), older.clone()], 4);

        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].part_id, older.part_id);
        assert_eq!(plan.draws[0].take, 3);
        assert_eq!(plan.draws[1].part_id, newer.part_id);
        assert_eq!(plan.draws[1].take, 1);
        assert_eq!(plan.shortfall, 0);
    }

    /// A newer row is never drawn from while an older row has stock left.
    #[test]
    fn test_newer_rows_untouched_when_older_suffices() {
        let older = stock_at(10, 0);
        let newer = stock_at(10, 60);

        let plan = plan_fifo_allocation(&[newer.clone(), older.clone()], 7);

        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].part_id, older.part_id);
        assert_eq!(plan.draws[0].take, 7);
    }

    /// Exhausted stock reports the uncovered remainder instead of drawing
    /// rows negative.
    #[test]
    fn test_shortfall_on_exhaustion() {
        let plan = plan_fifo_allocation(&[stock_at(2, 0), stock_at(1, 10)], 6);
        assert_eq!(plan.allocated(), 3);
        assert_eq!(plan.shortfall, 3);
        assert!(!plan.is_complete());
    }

    /// No stock at all: everything is shortfall.
    #[test]
    fn test_no_stock() {
        let plan = plan_fifo_allocation(&[], 4);
        assert!(plan.draws.is_empty());
        assert_eq!(plan.shortfall, 4);
    }

    /// Zero-quantity rows are skipped entirely.
    #[test]
    fn test_empty_rows_skipped() {
        let drained = stock_at(0, 0);
        let live = stock_at(5, 60);
        let plan = plan_fifo_allocation(&[drained, live.clone()], 2);

        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].part_id, live.part_id);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for a shelf of part rows with assorted quantities and ages
    fn shelf_strategy() -> impl Strategy<Value = Vec<PartStock>> {
        prop::collection::vec((0i32..=20i32, 0i64..=10_000i64), 0..12)
            .prop_map(|rows| {
                rows.into_iter()
                    .map(|(quantity, age)| stock_at(quantity, age))
                    .collect()
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        /// Conservation: allocated + shortfall always equals the ordered
        /// quantity, and no draw exceeds its row's stock.
        #[test]
        fn prop_allocation_conserves_quantity(shelf in shelf_strategy(), ordered in 0i32..=100i32) {
            let plan = plan_fifo_allocation(&shelf, ordered);

            prop_assert_eq!(plan.allocated() + plan.shortfall, ordered);

            for draw in &plan.draws {
                let row = shelf.iter().find(|p| p.part_id == draw.part_id).unwrap();
                prop_assert!(draw.take >= 1);
                prop_assert!(draw.take <= row.quantity);
            }
        }

        /// Applying the plan never pushes any row negative.
        #[test]
        fn prop_no_row_goes_negative(shelf in shelf_strategy(), ordered in 0i32..=100i32) {
            let plan = plan_fifo_allocation(&shelf, ordered);

            for row in &shelf {
                let drawn: i32 = plan
                    .draws
                    .iter()
                    .filter(|d| d.part_id == row.part_id)
                    .map(|d| d.take)
                    .sum();
                prop_assert!(row.quantity - drawn >= 0);
            }
        }

        /// Strict FIFO: every drawn-from row is no newer than any row with
        /// remaining stock, and a partially drawn row is the last draw.
        #[test]
        fn prop_draws_are_oldest_first(shelf in shelf_strategy(), ordered in 1i32..=100i32) {
            let plan = plan_fifo_allocation(&shelf, ordered);

            for (i, draw) in plan.draws.iter().enumerate() {
                let row = shelf.iter().find(|p| p.part_id == draw.part_id).unwrap();
                // A row drawn for less than its stock must be the final draw.
                if draw.take < row.quantity {
                    prop_assert_eq!(i, plan.draws.len() - 1);
                }
            }

            // Draw order follows row age.
            let mut last_created = None;
            for draw in &plan.draws {
                let row = shelf.iter().find(|p| p.part_id == draw.part_id).unwrap();
                if let Some(previous) = last_created {
                    prop_assert!(row.created_at >= previous);
                }
                last_created = Some(row.created_at);
            }
        }

        /// A shortfall is reported exactly when total stock cannot cover the
        /// order.
        #[test]
        fn prop_shortfall_iff_insufficient_stock(shelf in shelf_strategy(), ordered in 0i32..=100i32) {
            let total: i32 = shelf.iter().map(|p| p.quantity.max(0)).sum();
            let plan = plan_fifo_allocation(&shelf, ordered);

            if total >= ordered {
                prop_assert!(plan.is_complete());
            } else {
                prop_assert_eq!(plan.shortfall, ordered - total);
            }
        }
    }
}
