//! HTTP handlers for checkout

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::external::StripeClient;
use crate::services::checkout::{CheckoutRedirect, CreateCheckoutInput};
use crate::services::CheckoutService;
use crate::AppState;

/// Create a pending order and return the hosted checkout URL
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(input): Json<CreateCheckoutInput>,
) -> AppResult<Json<CheckoutRedirect>> {
    let stripe = StripeClient::new(state.config.stripe.secret_key.clone());
    let service = CheckoutService::new(
        state.db.clone(),
        stripe,
        state.config.server.storefront_url.clone(),
    );
    let redirect = service.create_checkout(input).await?;
    Ok(Json(redirect))
}
