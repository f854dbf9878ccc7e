//! Checkout session builder
//!
//! Snapshots catalog prices, creates the pending order, then opens the
//! hosted Stripe session. The order and its items are committed before the
//! session exists so a webhook that beats the redirect can still resolve the
//! order from its metadata id.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::{OrderStatus, ShippingOption};
use shared::validation::{validate_country_code, validate_order_quantity};

use crate::error::{AppError, AppResult};
use crate::external::stripe::CheckoutLineItem;
use crate::external::StripeClient;

/// Checkout session builder
#[derive(Clone)]
pub struct CheckoutService {
    db: PgPool,
    stripe: StripeClient,
    storefront_url: String,
}

/// One requested line, quantities only — prices come from the catalog.
#[derive(Debug, Deserialize)]
pub struct CheckoutItemInput {
    pub listing_id: Uuid,
    pub quantity: i32,
}

/// Input for creating a checkout session
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCheckoutInput {
    pub items: Vec<CheckoutItemInput>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub country_code: String,
    /// Aggregator output the customer will choose from, in display order
    pub shipping_options: Vec<ShippingOption>,
}

/// Redirect target for the hosted checkout page
#[derive(Debug, Serialize)]
pub struct CheckoutRedirect {
    pub url: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    title: String,
    price_cents: i64,
}

impl CheckoutService {
    /// Create a new CheckoutService instance
    pub fn new(db: PgPool, stripe: StripeClient, storefront_url: String) -> Self {
        Self {
            db,
            stripe,
            storefront_url,
        }
    }

    /// Create a pending order and open a hosted checkout session for it.
    pub async fn create_checkout(&self, input: CreateCheckoutInput) -> AppResult<CheckoutRedirect> {
        input.validate().map_err(|e| AppError::Validation {
            field: "checkout".to_string(),
            message: e.to_string(),
        })?;

        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "Checkout requires at least one item".to_string(),
            });
        }
        for item in &input.items {
            validate_order_quantity(item.quantity).map_err(|message| AppError::Validation {
                field: "quantity".to_string(),
                message: message.to_string(),
            })?;
        }
        validate_country_code(&input.country_code).map_err(|message| AppError::Validation {
            field: "country_code".to_string(),
            message: message.to_string(),
        })?;
        if input.shipping_options.is_empty() {
            return Err(AppError::Validation {
                field: "shipping_options".to_string(),
                message: "Checkout requires at least one shipping option".to_string(),
            });
        }

        // Authoritative prices: the catalog, not the client.
        let ids: Vec<Uuid> = input.items.iter().map(|i| i.listing_id).collect();
        let listings = sqlx::query_as::<_, ListingRow>(
            "SELECT id, title, price_cents FROM listings WHERE id = ANY($1) AND is_published = true",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut line_items = Vec::with_capacity(input.items.len());
        let mut subtotal_cents: i64 = 0;
        for item in &input.items {
            let listing = listings
                .iter()
                .find(|l| l.id == item.listing_id)
                .ok_or_else(|| AppError::NotFound("Listing".to_string()))?;
            subtotal_cents += listing.price_cents * item.quantity as i64;
            line_items.push(CheckoutLineItem {
                name: listing.title.clone(),
                unit_amount_cents: listing.price_cents,
                quantity: item.quantity,
            });
        }

        let customer = self.stripe.create_customer(&input.name, &input.email).await?;

        // Order and items must exist before the session does: the webhook
        // resolves the order by the id embedded in session metadata.
        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (email, customer_name, status, subtotal_cents, shipping_cents, shipping_country)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING id
            "#,
        )
        .bind(&input.email)
        .bind(&input.name)
        .bind(OrderStatus::Pending.as_str())
        .bind(subtotal_cents)
        .bind(input.country_code.to_uppercase())
        .fetch_one(&self.db)
        .await?;

        for (item, line) in input.items.iter().zip(&line_items) {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, listing_id, description, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(item.listing_id)
            .bind(&line.name)
            .bind(item.quantity)
            .bind(line.unit_amount_cents)
            .execute(&self.db)
            .await?;
        }

        let success_url = format!(
            "{}/checkout/success?order_id={}",
            self.storefront_url, order_id
        );
        let cancel_url = format!(
            "{}/checkout/cancelled?order_id={}",
            self.storefront_url, order_id
        );

        let session = self
            .stripe
            .create_checkout_session(
                &customer.id,
                order_id,
                &line_items,
                &input.shipping_options,
                &success_url,
                &cancel_url,
            )
            .await?;

        sqlx::query("UPDATE orders SET stripe_checkout_session_id = $1 WHERE id = $2")
            .bind(&session.id)
            .bind(order_id)
            .execute(&self.db)
            .await?;

        Ok(CheckoutRedirect { url: session.url })
    }
}
