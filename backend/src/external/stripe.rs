//! Stripe API client
//!
//! Covers the slice of the Stripe API the storefront uses: customer
//! creation, hosted checkout sessions, and webhook signature verification.
//! Requests use Stripe's form-encoded bracket syntax.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;

use crate::models::ShippingOption;

use crate::error::{AppError, AppResult};

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

/// A checkout line item, priced from the catalog (never from the client).
#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: i32,
}

/// Stripe customer (the fields we read back)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
}

/// Stripe checkout session (the fields we read back)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: String,
}

/// Stripe shipping rate (the fields we read back)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeShippingRate {
    pub id: String,
    pub display_name: Option<String>,
}

impl StripeClient {
    /// Create a new StripeClient
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url: "https://api.stripe.com/v1".to_string(),
        }
    }

    /// Create a new StripeClient with custom base URL (for testing)
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url,
        }
    }

    /// Create a customer record ahead of the checkout session.
    pub async fn create_customer(&self, name: &str, email: &str) -> AppResult<StripeCustomer> {
        let params = vec![
            ("name".to_string(), name.to_string()),
            ("email".to_string(), email.to_string()),
        ];
        self.post_form("/customers", params).await
    }

    /// Open a hosted checkout session.
    ///
    /// Line items carry catalog prices in cents; the shipping options are the
    /// aggregator's output, listed in order so the first one is pre-selected.
    /// The order id rides in metadata so the webhook can resolve the order
    /// even if it arrives before the redirect does.
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        order_id: uuid::Uuid,
        line_items: &[CheckoutLineItem],
        shipping_options: &[ShippingOption],
        success_url: &str,
        cancel_url: &str,
    ) -> AppResult<StripeCheckoutSession> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("customer".to_string(), customer_id.to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("metadata[order_id]".to_string(), order_id.to_string()),
        ];

        for (i, item) in line_items.iter().enumerate() {
            params.push((
                format!("line_items[{}][price_data][currency]", i),
                "aud".to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.name.clone(),
            ));
            params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                item.unit_amount_cents.to_string(),
            ));
            params.push((
                format!("line_items[{}][quantity]", i),
                item.quantity.to_string(),
            ));
        }

        for (i, option) in shipping_options.iter().enumerate() {
            let prefix = format!("shipping_options[{}][shipping_rate_data]", i);
            params.push((format!("{}[type]", prefix), "fixed_amount".to_string()));
            params.push((
                format!("{}[display_name]", prefix),
                option.display_name.clone(),
            ));
            params.push((
                format!("{}[fixed_amount][amount]", prefix),
                option.amount_cents.to_string(),
            ));
            params.push((
                format!("{}[fixed_amount][currency]", prefix),
                option.currency.to_lowercase(),
            ));
        }

        self.post_form("/checkout/sessions", params).await
    }

    /// Look up the shipping rate the customer picked, to recover its
    /// display name for the order record.
    pub async fn get_shipping_rate(&self, rate_id: &str) -> AppResult<StripeShippingRate> {
        let response = self
            .client
            .get(format!("{}/shipping_rates/{}", self.base_url, rate_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentProvider(format!(
                "Stripe returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("failed to parse response: {}", e)))
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> AppResult<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentProvider(format!(
                "Stripe returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("failed to parse response: {}", e)))
    }
}

/// Verify a `Stripe-Signature` header against the raw webhook payload.
///
/// The header carries a timestamp and one or more `v1` signatures; each `v1`
/// is HMAC-SHA256 over `"{timestamp}.{payload}"` with the endpoint secret,
/// hex encoded.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), String> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in signature_header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or("Missing timestamp in signature header")?;
    if signatures.is_empty() {
        return Err("Missing v1 signature in signature header".to_string());
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if signatures.iter().any(|s| *s == expected) {
        Ok(())
    } else {
        Err("Signature mismatch".to_string())
    }
}
