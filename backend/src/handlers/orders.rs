//! HTTP handlers for order management (admin)

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentAdmin;
use crate::services::notification::NotificationService;
use crate::services::orders::{Order, OrderWithItems, UpdateStatusInput};
use crate::services::settlement::CashOrderInput;
use crate::services::{OrderService, SettlementService};
use crate::AppState;

/// Order list query parameters
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

/// Response for the cash order endpoint
#[derive(Debug, Serialize)]
pub struct CashOrderResponse {
    pub success: bool,
    pub order_id: Uuid,
}

fn order_service(state: &AppState) -> OrderService {
    let notifications = NotificationService::new(
        state.db.clone(),
        state.mailer.clone(),
        state.config.email.orders_address.clone(),
    );
    OrderService::new(state.db.clone(), notifications)
}

/// List orders
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = order_service(&state).list_orders(query.status).await?;
    Ok(Json(orders))
}

/// Get one order with items
pub async fn get_order(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderWithItems>> {
    let order = order_service(&state).get_order(order_id).await?;
    Ok(Json(order))
}

/// Transition an order's status
pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> AppResult<Json<Order>> {
    let order = order_service(&state).update_status(order_id, input).await?;
    Ok(Json(order))
}

/// Export orders as CSV
pub async fn export_orders(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> AppResult<impl IntoResponse> {
    let csv = order_service(&state).export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"orders.csv\"",
            ),
        ],
        csv,
    ))
}

/// Record a cash sale: order is created already paid, invoice raised
/// synchronously, no rate aggregation.
pub async fn create_cash_order(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(input): Json<CashOrderInput>,
) -> AppResult<Json<CashOrderResponse>> {
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
    let order_id = service.create_cash_order(input).await?;
    Ok(Json(CashOrderResponse {
        success: true,
        order_id,
    }))
}
