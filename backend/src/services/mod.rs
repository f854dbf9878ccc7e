//! Business logic services for the Wreckyard storefront

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod notification;
pub mod orders;
pub mod settlement;
pub mod shipping;

pub use auth::AuthService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use notification::NotificationService;
pub use orders::OrderService;
pub use settlement::SettlementService;
pub use shipping::ShippingService;
