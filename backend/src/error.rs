//! Error handling for the Wreckyard storefront backend
//!
//! Every handler returns `AppResult<T>`; failures render as a JSON envelope
//! with a stable machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Oversold listing {listing_id}: ordered {ordered}, only {allocated} allocated")]
    Oversell {
        listing_id: uuid::Uuid,
        ordered: i32,
        allocated: i32,
    },

    // Shipping errors
    #[error("No shipping services available: {0}")]
    ShippingUnavailable(String),

    #[error("Interparcel CSRF token unavailable")]
    CsrfTokenUnavailable,

    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    // Payment / accounting errors
    #[error("Stripe error: {0}")]
    PaymentProvider(String),

    #[error("Xero error: {0}")]
    Accounting(String),

    #[error("Settlement failed: {0}")]
    Settlement(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid email or password"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_STOCK", msg.clone()),
            ),
            AppError::Oversell { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("OVERSELL", self.to_string()),
            ),
            AppError::ShippingUnavailable(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "SHIPPING_UNAVAILABLE",
                    "Unable to calculate shipping for this destination",
                ),
            ),
            AppError::CsrfTokenUnavailable => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "CSRF_TOKEN_UNAVAILABLE",
                    "Carrier quote page did not provide a token",
                ),
            ),
            AppError::Provider { provider, message } => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "CARRIER_ERROR",
                    format!("{} error: {}", provider, message),
                ),
            ),
            AppError::PaymentProvider(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("PAYMENT_PROVIDER_ERROR", msg.clone()),
            ),
            AppError::Accounting(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("ACCOUNTING_ERROR", msg.clone()),
            ),
            AppError::Settlement(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("SETTLEMENT_ERROR", msg.clone()),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CONFIGURATION_ERROR", msg.clone()),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
