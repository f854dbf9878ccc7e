//! HTTP handlers for the Wreckyard storefront

mod auth;
mod catalog;
mod checkout;
mod health;
mod orders;
mod shipping;
mod webhooks;

pub use auth::*;
pub use catalog::*;
pub use checkout::*;
pub use health::*;
pub use orders::*;
pub use shipping::*;
pub use webhooks::*;
