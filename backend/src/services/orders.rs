//! Order management service
//!
//! Admin reads, status transitions, and the CSV export. The shipped and
//! ready-for-pickup transitions fire their buyer notifications best-effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::OrderStatus;

use crate::error::{AppError, AppResult};
use crate::services::notification::NotificationService;

/// Order management service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    notifications: NotificationService,
}

/// Full order record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub email: String,
    pub customer_name: String,
    pub phone: Option<String>,
    pub status: String,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub shipping_method: Option<String>,
    pub carrier: Option<String>,
    pub shipping_line1: Option<String>,
    pub shipping_line2: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_postcode: Option<String>,
    pub shipping_country: Option<String>,
    pub tracking_number: Option<String>,
    pub xero_invoice_id: Option<String>,
    pub xero_invoice_number: Option<String>,
    pub stripe_checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = r#"
    id, email, customer_name, phone, status, subtotal_cents, shipping_cents,
    shipping_method, carrier, shipping_line1, shipping_line2, shipping_city,
    shipping_state, shipping_postcode, shipping_country, tracking_number,
    xero_invoice_id, xero_invoice_number, stripe_checkout_session_id,
    created_at, updated_at
"#;

/// One line of an order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub listing_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// Order with its items
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Input for a status transition
#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// List orders, optionally filtered by status, newest first.
    pub async fn list_orders(&self, status: Option<String>) -> AppResult<Vec<Order>> {
        let orders = match status {
            Some(status) => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {} FROM orders WHERE status = $1 ORDER BY created_at DESC",
                    ORDER_COLUMNS
                ))
                .bind(status)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {} FROM orders ORDER BY created_at DESC",
                    ORDER_COLUMNS
                ))
                .fetch_all(&self.db)
                .await?
            }
        };
        Ok(orders)
    }

    /// One order with its items.
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderWithItems> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, listing_id, description, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(OrderWithItems { order, items })
    }

    /// Move an order to a new status.
    ///
    /// Shipping requires a tracking number; the shipped and ready-for-pickup
    /// transitions notify the buyer after the row is updated.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        input: UpdateStatusInput,
    ) -> AppResult<Order> {
        let next = OrderStatus::parse(&input.status).ok_or_else(|| AppError::Validation {
            field: "status".to_string(),
            message: format!("Unknown status: {}", input.status),
        })?;

        let order = self.get_order(order_id).await?.order;
        let current = OrderStatus::parse(&order.status).ok_or_else(|| {
            AppError::Internal(format!("order {} has corrupt status", order_id))
        })?;

        if !current.can_transition_to(next) {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot move order from {} to {}",
                current, next
            )));
        }

        if next == OrderStatus::Shipped && input.tracking_number.is_none() {
            return Err(AppError::Validation {
                field: "tracking_number".to_string(),
                message: "Shipping an order requires a tracking number".to_string(),
            });
        }

        let updated = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $1,
                tracking_number = COALESCE($2, tracking_number),
                carrier = COALESCE($3, carrier),
                updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(next.as_str())
        .bind(&input.tracking_number)
        .bind(&input.carrier)
        .bind(order_id)
        .fetch_one(&self.db)
        .await?;

        match next {
            OrderStatus::Shipped => {
                let tracking = updated.tracking_number.clone().unwrap_or_default();
                let carrier = updated.carrier.clone().unwrap_or_default();
                self.notifications
                    .notify_shipped(updated.id, &updated.email, &tracking, &carrier)
                    .await;
            }
            OrderStatus::ReadyForPickup => {
                self.notifications
                    .notify_ready_for_pickup(updated.id, &updated.email)
                    .await;
            }
            _ => {}
        }

        Ok(updated)
    }

    /// Export all orders as CSV for the back office.
    pub async fn export_csv(&self) -> AppResult<String> {
        let orders = self.list_orders(None).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "id",
                "created_at",
                "customer_name",
                "email",
                "status",
                "subtotal_cents",
                "shipping_cents",
                "shipping_method",
                "carrier",
                "tracking_number",
                "xero_invoice_number",
            ])
            .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;

        for order in orders {
            writer
                .write_record([
                    order.id.to_string(),
                    order.created_at.to_rfc3339(),
                    order.customer_name,
                    order.email,
                    order.status,
                    order.subtotal_cents.to_string(),
                    order.shipping_cents.to_string(),
                    order.shipping_method.unwrap_or_default(),
                    order.carrier.unwrap_or_default(),
                    order.tracking_number.unwrap_or_default(),
                    order.xero_invoice_number.unwrap_or_default(),
                ])
                .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))
    }
}
