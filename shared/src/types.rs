//! Common types used across the platform
//!
//! All money is carried as integer minor units (cents) internally. Decimal
//! values only appear at the provider boundary: parsing carrier rate strings
//! and emitting major-unit amounts to the accounting system.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency every quote and order is denominated in.
pub const CURRENCY_AUD: &str = "AUD";

/// Convert a provider's decimal price to integer cents, always rounding up.
///
/// Carriers quote prices like "17.35"; rounding down would undercharge the
/// shop on every label bought, so the conversion is a ceiling, never
/// nearest-even. Returns `None` when the amount does not fit an `i64`.
pub fn cents_from_decimal_ceil(amount: Decimal) -> Option<i64> {
    (amount * Decimal::from(100)).ceil().to_i64()
}

/// Convert integer cents back to a major-unit decimal (e.g. for invoice lines).
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(page: u32, per_page: u32, total_items: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            ((total_items + per_page as u64 - 1) / per_page as u64) as u32
        };
        Self {
            page,
            per_page,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cents_ceiling_rounds_up() {
        let price = Decimal::from_str("17.351").unwrap();
        assert_eq!(cents_from_decimal_ceil(price), Some(1736));
    }

    #[test]
    fn test_cents_ceiling_exact() {
        let price = Decimal::from_str("17.35").unwrap();
        assert_eq!(cents_from_decimal_ceil(price), Some(1735));
    }

    #[test]
    fn test_cents_round_trip_major_units() {
        assert_eq!(cents_to_decimal(1736), Decimal::from_str("17.36").unwrap());
        assert_eq!(cents_to_decimal(0), Decimal::ZERO);
    }

    #[test]
    fn test_pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
    }
}
