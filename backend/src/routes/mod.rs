//! Route definitions for the Wreckyard storefront

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .route("/auth/login", post(handlers::login))
        // Stripe webhook (public - signature-verified)
        .route("/webhook/stripe", post(handlers::handle_stripe_webhook))
        // Public storefront routes
        .route("/listings", get(handlers::list_listings))
        .route("/listings/:listing_id", get(handlers::get_listing))
        .route("/shipping/quote", post(handlers::get_shipping_quote))
        .route("/checkout", post(handlers::create_checkout))
        // Protected back-office routes
        .nest("/admin", admin_routes())
}

/// Back-office routes (protected)
fn admin_routes() -> Router<AppState> {
    Router::new()
        // Shipping quote with the admin placeholder rate
        .route("/shipping/quote", post(handlers::get_admin_shipping_quote))
        // Orders
        .route("/orders", get(handlers::list_orders))
        .route("/orders/export", get(handlers::export_orders))
        .route("/orders/cash", post(handlers::create_cash_order))
        .route("/orders/:order_id", get(handlers::get_order))
        .route("/orders/:order_id/status", put(handlers::update_order_status))
        // Listings
        .route(
            "/listings",
            get(handlers::list_all_listings).post(handlers::create_listing),
        )
        .route(
            "/listings/:listing_id",
            put(handlers::update_listing).delete(handlers::delete_listing),
        )
        // Donors
        .route(
            "/donors",
            get(handlers::list_donors).post(handlers::create_donor),
        )
        .route(
            "/donors/:donor_id",
            get(handlers::get_donor).delete(handlers::delete_donor),
        )
        // Parts
        .route("/parts", post(handlers::create_part))
        .route(
            "/parts/:part_id",
            put(handlers::update_part).delete(handlers::delete_part),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
