//! Configuration management for the Wreckyard storefront backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WRY_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration (admin API)
    pub jwt: JwtConfig,

    /// Stripe payment configuration
    pub stripe: StripeConfig,

    /// Xero accounting configuration
    pub xero: XeroConfig,

    /// AusPost rate API configuration
    pub auspost: AusPostConfig,

    /// Interparcel rate API configuration
    pub interparcel: InterparcelConfig,

    /// Transactional email configuration
    pub email: EmailConfig,

    /// Settlement behavior configuration
    pub settlement: SettlementConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Public base URL of the storefront (checkout redirect targets)
    pub storefront_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing admin JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StripeConfig {
    /// Secret API key
    pub secret_key: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct XeroConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Long-lived refresh token used to mint access tokens
    pub refresh_token: String,

    /// Tenant the invoices are written to
    pub tenant_id: String,

    /// Revenue account code used on invoice lines
    pub sales_account_code: String,

    /// Bank account code payments are recorded against
    pub payment_account_code: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AusPostConfig {
    /// Rate API endpoint
    pub base_url: String,

    /// API key sent in the AUTH-KEY header
    pub api_key: String,

    /// Postcode parcels ship from (the yard)
    pub from_postcode: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InterparcelConfig {
    /// API endpoint for availability and per-service quotes
    pub base_url: String,

    /// Quote page used for CSRF token acquisition
    pub quote_page_url: String,

    /// Session cookie sent with per-service quote requests
    pub session_cookie: String,

    /// Suburb parcels ship from
    pub from_city: String,

    /// Postcode parcels ship from
    pub from_postcode: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// Transactional email API endpoint
    pub api_endpoint: String,

    /// Transactional email API key
    pub api_key: String,

    /// From address on outbound mail
    pub from_address: String,

    /// Address new-order notifications are sent to
    pub orders_address: String,
}

/// What to do when FIFO allocation runs out of stock mid-order.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OversellPolicy {
    /// Fail the settlement and flag the order for manual review
    Reject,
    /// Record the shortfall and settle anyway
    AllowPartial,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SettlementConfig {
    pub oversell_policy: OversellPolicy,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WRY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.storefront_url", "http://localhost:3000")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("auspost.base_url", "https://digitalapi.auspost.com.au")?
            .set_default("interparcel.base_url", "https://au.interparcel.com")?
            .set_default(
                "interparcel.quote_page_url",
                "https://au.interparcel.com/quote/quick-quote",
            )?
            .set_default("interparcel.from_city", "Melbourne")?
            .set_default("interparcel.from_postcode", "3175")?
            .set_default("auspost.from_postcode", "3175")?
            .set_default("email.api_endpoint", "")?
            .set_default("email.api_key", "")?
            .set_default("email.from_address", "orders@wreckyard.example")?
            .set_default("email.orders_address", "orders@wreckyard.example")?
            .set_default("settlement.oversell_policy", "reject")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WRY_ prefix)
            .add_source(
                Environment::with_prefix("WRY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            storefront_url: "http://localhost:3000".to_string(),
        }
    }
}
