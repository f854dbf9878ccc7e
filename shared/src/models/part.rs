//! Stock allocation planning
//!
//! A listing can be backed by several interchangeable part rows (the same
//! part stripped from different donor vehicles). Sales deplete the oldest
//! stock first so nothing ages on the shelf indefinitely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The slice of a part row the allocator needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartStock {
    pub part_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// One decrement against one part row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationDraw {
    pub part_id: Uuid,
    pub take: i32,
}

/// The full plan for one order item.
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    pub draws: Vec<AllocationDraw>,
    /// Units that could not be covered by stock. Zero on a clean allocation;
    /// anything above zero is an oversell.
    pub shortfall: i32,
}

impl AllocationPlan {
    pub fn allocated(&self) -> i32 {
        self.draws.iter().map(|d| d.take).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }
}

/// Plan a FIFO allocation of `ordered_qty` units across the given part rows.
///
/// Rows are consumed strictly oldest-`created_at`-first; a newer row is never
/// touched while an older one still has stock. Rows with zero (or negative)
/// quantity are skipped. The plan never draws more than a row holds, so
/// applying it cannot push any part quantity below zero.
pub fn plan_fifo_allocation(parts: &[PartStock], ordered_qty: i32) -> AllocationPlan {
    let mut ordered: Vec<&PartStock> = parts.iter().filter(|p| p.quantity > 0).collect();
    ordered.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.part_id.cmp(&b.part_id))
    });

    let mut remaining = ordered_qty.max(0);
    let mut draws = Vec::new();

    for part in ordered {
        if remaining == 0 {
            break;
        }
        let take = part.quantity.min(remaining);
        draws.push(AllocationDraw {
            part_id: part.part_id,
            take,
        });
        remaining -= take;
    }

    AllocationPlan {
        draws,
        shortfall: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stock(quantity: i32, minute: u32) -> PartStock {
        PartStock {
            part_id: Uuid::new_v4(),
            quantity,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_oldest_part_drains_first() {
        let older = stock(3, 0);
        let newer = stock(5, 30);
        let plan = plan_fifo_allocation(&[newer.clone(), older.clone()], 4);

        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0], AllocationDraw { part_id: older.part_id, take: 3 });
        assert_eq!(plan.draws[1], AllocationDraw { part_id: newer.part_id, take: 1 });
        assert!(plan.is_complete());
    }

    #[test]
    fn test_single_row_covers_order() {
        let row = stock(10, 0);
        let plan = plan_fifo_allocation(&[row.clone()], 4);
        assert_eq!(plan.draws, vec![AllocationDraw { part_id: row.part_id, take: 4 }]);
        assert_eq!(plan.shortfall, 0);
    }

    #[test]
    fn test_exhaustion_reports_shortfall() {
        let plan = plan_fifo_allocation(&[stock(2, 0), stock(1, 5)], 5);
        assert_eq!(plan.allocated(), 3);
        assert_eq!(plan.shortfall, 2);
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let empty = stock(0, 0);
        let live = stock(2, 10);
        let plan = plan_fifo_allocation(&[empty, live.clone()], 2);
        assert_eq!(plan.draws, vec![AllocationDraw { part_id: live.part_id, take: 2 }]);
    }
}
