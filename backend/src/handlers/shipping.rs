//! HTTP handlers for shipping quotes

use axum::{extract::State, Json};
use crate::models::{ShippingOption, ShippingQuoteRequest};

use crate::error::AppResult;
use crate::middleware::CurrentAdmin;
use crate::services::ShippingService;
use crate::AppState;

/// Resolve shipping options for a package (storefront checkout)
pub async fn get_shipping_quote(
    State(state): State<AppState>,
    Json(request): Json<ShippingQuoteRequest>,
) -> AppResult<Json<Vec<ShippingOption>>> {
    let service = ShippingService::new(&state.config);
    let options = service.get_shipping_services(&request, false).await?;
    Ok(Json(options))
}

/// Resolve shipping options with the admin placeholder rate included
pub async fn get_admin_shipping_quote(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(request): Json<ShippingQuoteRequest>,
) -> AppResult<Json<Vec<ShippingOption>>> {
    let service = ShippingService::new(&state.config);
    let options = service.get_shipping_services(&request, true).await?;
    Ok(Json(options))
}
