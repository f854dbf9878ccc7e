//! Post-payment settlement
//!
//! Runs after Stripe confirms payment: creates the Xero invoice, records the
//! payment against it, writes the shipping details onto the order, and
//! depletes stock oldest-first. The steps are strictly sequential — a payment
//! must never reference an invoice that was not created, and the order update
//! records identifiers produced by both.
//!
//! There is no compensating transaction. A failure mid-sequence leaves a
//! `settlement_failures` row holding the raw event for manual reprocessing;
//! the invoice-id idempotency guard makes webhook re-delivery safe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{plan_fifo_allocation, OrderStatus, PartStock};
use shared::types::cents_to_decimal;

use crate::config::OversellPolicy;
use crate::error::{AppError, AppResult};
use crate::external::xero::{InvoiceDraft, InvoiceLine, XeroInvoiceRef};
use crate::external::XeroClient;
use crate::services::notification::NotificationService;

/// The accounting operations settlement needs. `XeroClient` is the production
/// implementation; tests substitute a recording fake.
#[async_trait]
pub trait AccountingPort: Send + Sync {
    async fn create_invoice(&self, draft: &InvoiceDraft) -> AppResult<XeroInvoiceRef>;
    async fn record_payment(&self, invoice_id: &str, amount: Decimal) -> AppResult<()>;
    async fn email_invoice(&self, invoice_id: &str) -> AppResult<()>;
}

#[async_trait]
impl AccountingPort for XeroClient {
    async fn create_invoice(&self, draft: &InvoiceDraft) -> AppResult<XeroInvoiceRef> {
        XeroClient::create_invoice(self, draft).await
    }

    async fn record_payment(&self, invoice_id: &str, amount: Decimal) -> AppResult<()> {
        XeroClient::record_payment(self, invoice_id, amount).await
    }

    async fn email_invoice(&self, invoice_id: &str) -> AppResult<()> {
        XeroClient::email_invoice(self, invoice_id).await
    }
}

/// Payment-success event, as extracted from the Stripe webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSucceededEvent {
    pub order_id: Uuid,
    pub session_id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_cents: i64,
    /// Display name of the shipping option the customer picked
    pub shipping_method: String,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_postcode: Option<String>,
    pub address_country: Option<String>,
}

/// Input for the admin cash-order path
#[derive(Debug, Deserialize)]
pub struct CashOrderInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub shipping_method: String,
    pub postage_cents: i64,
    pub country_code: String,
    pub items: Vec<CashOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct CashOrderItem {
    pub listing_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct SettlementOrder {
    id: Uuid,
    email: String,
    customer_name: String,
    subtotal_cents: i64,
    xero_invoice_id: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    listing_id: Uuid,
    description: String,
    quantity: i32,
    unit_price_cents: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PartRow {
    id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
}

/// Settlement processor
#[derive(Clone)]
pub struct SettlementService {
    db: PgPool,
    accounting: Arc<dyn AccountingPort>,
    notifications: NotificationService,
    oversell_policy: OversellPolicy,
}

/// Build the invoice draft for an order: one line per purchased listing plus
/// a shipping line when shipping was paid for. Cent amounts become
/// major-unit decimals here and nowhere else.
pub fn build_invoice_draft(
    order_id: Uuid,
    customer_name: &str,
    customer_email: &str,
    items: &[(String, i32, i64)],
    shipping_cents: i64,
    shipping_method: &str,
) -> InvoiceDraft {
    let mut lines: Vec<InvoiceLine> = items
        .iter()
        .map(|(description, quantity, unit_price_cents)| InvoiceLine {
            description: description.clone(),
            quantity: *quantity,
            unit_amount: cents_to_decimal(*unit_price_cents),
        })
        .collect();

    if shipping_cents > 0 {
        lines.push(InvoiceLine {
            description: format!("Shipping - {}", shipping_method),
            quantity: 1,
            unit_amount: cents_to_decimal(shipping_cents),
        });
    }

    InvoiceDraft {
        contact_name: customer_name.to_string(),
        contact_email: customer_email.to_string(),
        reference: format!("Order {}", order_id),
        lines,
    }
}

/// Derive the carrier recorded on the order from the chosen option name.
pub fn carrier_for_method(shipping_method: &str) -> &'static str {
    if shipping_method.starts_with("AusPost") {
        "AusPost"
    } else if shipping_method == "Pickup" {
        "Pickup"
    } else if shipping_method == "Admin Shipping" {
        "Manual"
    } else {
        "Interparcel"
    }
}

impl SettlementService {
    /// Create a new SettlementService instance
    pub fn new(
        db: PgPool,
        accounting: Arc<dyn AccountingPort>,
        notifications: NotificationService,
        oversell_policy: OversellPolicy,
    ) -> Self {
        Self {
            db,
            accounting,
            notifications,
            oversell_policy,
        }
    }

    /// Settle a paid order. On failure the raw event is recorded for manual
    /// reprocessing before the error propagates.
    pub async fn settle(
        &self,
        event: PaymentSucceededEvent,
        raw_payload: serde_json::Value,
    ) -> AppResult<()> {
        let order_id = event.order_id;
        match self.run_settlement(&event).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Settlement failed, recording for manual reprocessing");
                self.record_failure(order_id, &e, raw_payload).await;
                Err(e)
            }
        }
    }

    async fn run_settlement(&self, event: &PaymentSucceededEvent) -> AppResult<()> {
        let order = sqlx::query_as::<_, SettlementOrder>(
            "SELECT id, email, customer_name, subtotal_cents, xero_invoice_id FROM orders WHERE id = $1",
        )
        .bind(event.order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        // At most one invoice per order. A re-delivered webhook is a no-op.
        if order.xero_invoice_id.is_some() {
            tracing::info!(order_id = %order.id, "Order already settled, skipping");
            return Ok(());
        }

        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT listing_id, description, quantity, unit_price_cents FROM order_items WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_all(&self.db)
        .await?;

        if items.is_empty() {
            return Err(AppError::Settlement(format!(
                "order {} has no items",
                order.id
            )));
        }

        // Stripe may omit customer details; the order row has them from
        // checkout.
        let contact_name = if event.customer_name.is_empty() {
            order.customer_name.clone()
        } else {
            event.customer_name.clone()
        };
        let contact_email = if event.customer_email.is_empty() {
            order.email.clone()
        } else {
            event.customer_email.clone()
        };

        let draft_items: Vec<(String, i32, i64)> = items
            .iter()
            .map(|i| (i.description.clone(), i.quantity, i.unit_price_cents))
            .collect();
        let draft = build_invoice_draft(
            order.id,
            &contact_name,
            &contact_email,
            &draft_items,
            event.shipping_cents,
            &event.shipping_method,
        );

        // Invoice first, payment second, order update third. Hard ordering.
        let invoice = self.accounting.create_invoice(&draft).await?;
        self.accounting
            .record_payment(&invoice.invoice_id, draft.total())
            .await?;

        let carrier = carrier_for_method(&event.shipping_method);
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, shipping_cents = $2, shipping_method = $3, carrier = $4,
                xero_invoice_id = $5, xero_invoice_number = $6,
                shipping_line1 = $7, shipping_line2 = $8, shipping_city = $9,
                shipping_state = $10, shipping_postcode = $11,
                shipping_country = COALESCE($12, shipping_country),
                updated_at = NOW()
            WHERE id = $13
            "#,
        )
        .bind(OrderStatus::Paid.as_str())
        .bind(event.shipping_cents)
        .bind(&event.shipping_method)
        .bind(carrier)
        .bind(&invoice.invoice_id)
        .bind(&invoice.invoice_number)
        .bind(&event.address_line1)
        .bind(&event.address_line2)
        .bind(&event.address_city)
        .bind(&event.address_state)
        .bind(&event.address_postcode)
        .bind(&event.address_country)
        .bind(order.id)
        .execute(&self.db)
        .await?;

        self.allocate_inventory(order.id, &items).await?;

        // Best-effort from here on.
        if let Err(e) = self.accounting.email_invoice(&invoice.invoice_id).await {
            tracing::warn!(order_id = %order.id, error = %e, "Invoice email dispatch failed");
        }
        let total_cents = order.subtotal_cents + event.shipping_cents;
        self.notifications
            .notify_new_order(order.id, &contact_name, total_cents)
            .await;

        Ok(())
    }

    /// Deplete stock for every item on the order, oldest part rows first.
    ///
    /// Each draw is a conditional decrement so a concurrent settlement
    /// racing on the same part row cannot push quantity negative; the whole
    /// allocation runs in one transaction.
    async fn allocate_inventory(&self, order_id: Uuid, items: &[OrderItemRow]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for item in items {
            let parts = sqlx::query_as::<_, PartRow>(
                "SELECT id, quantity, created_at FROM parts WHERE listing_id = $1 ORDER BY created_at ASC",
            )
            .bind(item.listing_id)
            .fetch_all(&mut *tx)
            .await?;

            let stock: Vec<PartStock> = parts
                .iter()
                .map(|p| PartStock {
                    part_id: p.id,
                    quantity: p.quantity,
                    created_at: p.created_at,
                })
                .collect();

            let plan = plan_fifo_allocation(&stock, item.quantity);

            if !plan.is_complete() {
                match self.oversell_policy {
                    OversellPolicy::Reject => {
                        return Err(AppError::Oversell {
                            listing_id: item.listing_id,
                            ordered: item.quantity,
                            allocated: plan.allocated(),
                        });
                    }
                    OversellPolicy::AllowPartial => {
                        tracing::warn!(
                            order_id = %order_id,
                            listing_id = %item.listing_id,
                            shortfall = plan.shortfall,
                            "Allocation shortfall accepted by policy"
                        );
                    }
                }
            }

            for draw in &plan.draws {
                let result = sqlx::query(
                    "UPDATE parts SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1",
                )
                .bind(draw.take)
                .bind(draw.part_id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::Settlement(format!(
                        "part {} changed during allocation for order {}",
                        draw.part_id, order_id
                    )));
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_failure(&self, order_id: Uuid, error: &AppError, raw_payload: serde_json::Value) {
        let recorded = sqlx::query(
            r#"
            INSERT INTO settlement_failures (order_id, error_message, payload)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(order_id)
        .bind(error.to_string())
        .bind(raw_payload)
        .execute(&self.db)
        .await;

        if let Err(e) = recorded {
            tracing::error!(order_id = %order_id, error = %e, "Failed to record settlement failure");
        }
    }

    /// Manually recorded cash sale: the order is created already paid, stock
    /// is decremented in whatever row order the query returns (no FIFO
    /// guarantee), and the invoice is created synchronously in this request.
    /// Shipping cost is operator-entered; the rate aggregator never runs.
    pub async fn create_cash_order(&self, input: CashOrderInput) -> AppResult<Uuid> {
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "Cash order requires at least one item".to_string(),
            });
        }
        if input.postage_cents < 0 {
            return Err(AppError::Validation {
                field: "postage_cents".to_string(),
                message: "Postage cannot be negative".to_string(),
            });
        }

        #[derive(sqlx::FromRow)]
        struct ListingRow {
            id: Uuid,
            title: String,
            price_cents: i64,
        }

        let ids: Vec<Uuid> = input.items.iter().map(|i| i.listing_id).collect();
        let listings = sqlx::query_as::<_, ListingRow>(
            "SELECT id, title, price_cents FROM listings WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut subtotal_cents: i64 = 0;
        let mut draft_items: Vec<(String, i32, i64)> = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let listing = listings
                .iter()
                .find(|l| l.id == item.listing_id)
                .ok_or_else(|| AppError::NotFound("Listing".to_string()))?;
            subtotal_cents += listing.price_cents * item.quantity as i64;
            draft_items.push((listing.title.clone(), item.quantity, listing.price_cents));
        }

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (email, customer_name, phone, status, subtotal_cents, shipping_cents,
                                shipping_method, carrier, shipping_country)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(OrderStatus::Paid.as_str())
        .bind(subtotal_cents)
        .bind(input.postage_cents)
        .bind(&input.shipping_method)
        .bind(carrier_for_method(&input.shipping_method))
        .bind(input.country_code.to_uppercase())
        .fetch_one(&self.db)
        .await?;

        for (item, (title, quantity, price_cents)) in input.items.iter().zip(&draft_items) {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, listing_id, description, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(item.listing_id)
            .bind(title)
            .bind(quantity)
            .bind(price_cents)
            .execute(&self.db)
            .await?;
        }

        // Decrement without FIFO ordering: rows come back in query order and
        // are consumed as found.
        for item in &input.items {
            let parts = sqlx::query_as::<_, PartRow>(
                "SELECT id, quantity, created_at FROM parts WHERE listing_id = $1",
            )
            .bind(item.listing_id)
            .fetch_all(&self.db)
            .await?;

            let mut remaining = item.quantity;
            for part in parts {
                if remaining == 0 {
                    break;
                }
                let take = part.quantity.min(remaining);
                if take == 0 {
                    continue;
                }
                sqlx::query(
                    "UPDATE parts SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1",
                )
                .bind(take)
                .bind(part.id)
                .execute(&self.db)
                .await?;
                remaining -= take;
            }

            if remaining > 0 {
                return Err(AppError::InsufficientStock(format!(
                    "listing {} short by {} unit(s)",
                    item.listing_id, remaining
                )));
            }
        }

        let draft = build_invoice_draft(
            order_id,
            &input.name,
            &input.email,
            &draft_items,
            input.postage_cents,
            &input.shipping_method,
        );
        let invoice = self.accounting.create_invoice(&draft).await?;
        self.accounting
            .record_payment(&invoice.invoice_id, draft.total())
            .await?;

        sqlx::query(
            "UPDATE orders SET xero_invoice_id = $1, xero_invoice_number = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(&invoice.invoice_id)
        .bind(&invoice.invoice_number)
        .bind(order_id)
        .execute(&self.db)
        .await?;

        Ok(order_id)
    }
}
