//! Domain models for the Wreckyard storefront backend
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
