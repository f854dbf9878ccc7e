//! HTTP handler for the Stripe payment webhook

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::external::stripe::verify_webhook_signature;
use crate::external::StripeClient;
use crate::services::notification::NotificationService;
use crate::services::settlement::PaymentSucceededEvent;
use crate::services::SettlementService;
use crate::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Response for webhook processing
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// Event Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeSessionObject,
}

#[derive(Debug, Deserialize)]
struct StripeSessionObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    customer_details: Option<CustomerDetails>,
    shipping_cost: Option<ShippingCost>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
    name: Option<String>,
    address: Option<StripeAddress>,
}

#[derive(Debug, Deserialize)]
struct StripeAddress {
    line1: Option<String>,
    line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShippingCost {
    #[serde(default)]
    amount_total: i64,
    shipping_rate: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Handle Stripe webhook events
/// POST /webhook/stripe
///
/// Verifies the signature over the raw body, then settles the order on
/// checkout.session.completed. Settlement failures are recorded for manual
/// reprocessing and reported back with success=false; the response is still
/// 200 so Stripe does not hammer a flow that needs a human anyway.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<WebhookResponse>)> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Err(e) = verify_webhook_signature(&body, signature, &state.config.stripe.webhook_secret)
    {
        tracing::warn!("Stripe webhook signature verification failed: {}", e);
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse {
                success: false,
                message: "Invalid signature".to_string(),
            }),
        ));
    }

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse Stripe webhook: {}", e);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse {
                    success: false,
                    message: format!("Invalid request body: {}", e),
                }),
            ));
        }
    };

    if event.event_type != "checkout.session.completed" {
        return Ok(Json(WebhookResponse {
            success: true,
            message: format!("Ignored event type {}", event.event_type),
        }));
    }

    let session = event.data.object;

    let order_id = match session
        .metadata
        .get("order_id")
        .and_then(|v| Uuid::parse_str(v).ok())
    {
        Some(id) => id,
        None => {
            tracing::error!(session_id = %session.id, "Checkout session has no order_id metadata");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse {
                    success: false,
                    message: "Missing order_id metadata".to_string(),
                }),
            ));
        }
    };

    // Recover the display name of the chosen shipping option.
    let stripe = StripeClient::new(state.config.stripe.secret_key.clone());
    let shipping_cost = session.shipping_cost.as_ref();
    let shipping_method = match shipping_cost.and_then(|c| c.shipping_rate.as_deref()) {
        Some(rate_id) => stripe
            .get_shipping_rate(rate_id)
            .await
            .ok()
            .and_then(|r| r.display_name)
            .unwrap_or_else(|| "Shipping".to_string()),
        None => "Shipping".to_string(),
    };

    let customer = session.customer_details.unwrap_or(CustomerDetails {
        email: None,
        name: None,
        address: None,
    });
    let address = customer.address.unwrap_or(StripeAddress {
        line1: None,
        line2: None,
        city: None,
        state: None,
        postal_code: None,
        country: None,
    });

    let settlement_event = PaymentSucceededEvent {
        order_id,
        session_id: session.id,
        customer_email: customer.email.unwrap_or_default(),
        customer_name: customer.name.unwrap_or_default(),
        shipping_cents: shipping_cost.map(|c| c.amount_total).unwrap_or(0),
        shipping_method,
        address_line1: address.line1,
        address_line2: address.line2,
        address_city: address.city,
        address_state: address.state,
        address_postcode: address.postal_code,
        address_country: address.country,
    };

    let raw_payload: serde_json::Value =
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    let notifications = NotificationService::new(
        state.db.clone(),
        state.mailer.clone(),
        state.config.email.orders_address.clone(),
    );
    let service = SettlementService::new(
        state.db.clone(),
        Arc::new(state.xero.clone()),
        notifications,
        state.config.settlement.oversell_policy,
    );

    if let Err(e) = service.settle(settlement_event, raw_payload).await {
        tracing::error!("Failed to settle order {}: {}", order_id, e);
        // Still return 200: the failure is recorded for manual reprocessing
        return Ok(Json(WebhookResponse {
            success: false,
            message: format!("Settlement error: {}", e),
        }));
    }

    Ok(Json(WebhookResponse {
        success: true,
        message: "Order settled".to_string(),
    }))
}
