//! Interparcel rate client
//!
//! Quoting runs in three phases against the broker:
//!
//! 1. availability — which carrier services can handle the package at all
//! 2. CSRF acquisition — the per-service quote endpoint is CSRF-protected,
//!    and the only token source today is the public quote page's
//!    `<meta name="csrf-token">` tag
//! 3. per-service quoting — one request per available service, all in
//!    flight at once; a failing service drops out without sinking the batch
//!
//! A fresh token is scraped for every quote flow; nothing is cached across
//! requests.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use crate::models::{ShippingOption, ShippingQuoteRequest};
use shared::types::cents_from_decimal_ceil;

use crate::error::{AppError, AppResult};

/// Carrier services never offered through the storefront.
const EXCLUDED_KEYWORD: &str = "Hunter";

/// Services gated behind business accounts.
const B2B_KEYWORD: &str = "b2b";

/// Above this weight the package books as a pallet.
fn pallet_threshold_kg() -> Decimal {
    Decimal::from(35)
}

/// Display cap on quoted services, in provider response order.
const MAX_SERVICES: usize = 4;

/// Source of the CSRF token needed by the per-service quote endpoint.
///
/// The default implementation scrapes the quote page. The trait exists so the
/// scrape can be replaced if the provider ever ships a documented token API,
/// and so tests can inject a fixed token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn csrf_token(&self, package: &PackageSpec, request: &ShippingQuoteRequest)
        -> AppResult<String>;
}

/// Scrapes the CSRF token out of the public quote page HTML.
pub struct QuotePageTokenProvider {
    client: Client,
    quote_page_url: String,
}

impl QuotePageTokenProvider {
    pub fn new(quote_page_url: String) -> Self {
        Self {
            client: Client::new(),
            quote_page_url,
        }
    }
}

#[async_trait]
impl TokenProvider for QuotePageTokenProvider {
    async fn csrf_token(
        &self,
        package: &PackageSpec,
        request: &ShippingQuoteRequest,
    ) -> AppResult<String> {
        let url = format!(
            "{}?type={}&length={}&width={}&height={}&weight={}&del_country={}",
            self.quote_page_url,
            package.kind,
            package.length_cm,
            package.width_cm,
            package.height_cm,
            package.weight_kg,
            request.destination_country.to_uppercase(),
        );

        let html = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Provider {
                provider: "Interparcel".to_string(),
                message: format!("quote page fetch failed: {}", e),
            })?
            .text()
            .await
            .map_err(|e| AppError::Provider {
                provider: "Interparcel".to_string(),
                message: format!("quote page read failed: {}", e),
            })?;

        extract_csrf_token(&html).ok_or(AppError::CsrfTokenUnavailable)
    }
}

/// Pull the content of `<meta name="csrf-token" content="...">` out of a page.
///
/// There is no fallback extraction path (JS variable, cookie) today.
fn extract_csrf_token(html: &str) -> Option<String> {
    let meta_at = html.find("name=\"csrf-token\"")?;
    let rest = &html[meta_at..];
    // The content attribute follows the name attribute on this page.
    let content_at = rest.find("content=\"")? + "content=\"".len();
    let value = &rest[content_at..];
    let end = value.find('"')?;
    let token = &value[..end];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// How the package is presented to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// "parcel" or "pallet"
    pub kind: &'static str,
    pub length_cm: Decimal,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
    pub weight_kg: Decimal,
}

impl PackageSpec {
    /// Size the package for quoting. Heavy shipments book as pallets with a
    /// packaging allowance added for the pallet and wrapping.
    pub fn from_request(request: &ShippingQuoteRequest) -> Self {
        if request.weight_kg > pallet_threshold_kg() {
            Self {
                kind: "pallet",
                length_cm: request.length_cm + Decimal::from(30),
                width_cm: request.width_cm + Decimal::from(30),
                height_cm: request.height_cm + Decimal::from(10),
                weight_kg: request.weight_kg,
            }
        } else {
            Self {
                kind: "parcel",
                length_cm: request.length_cm,
                width_cm: request.width_cm,
                height_cm: request.height_cm,
                weight_kg: request.weight_kg,
            }
        }
    }
}

/// Whether a service from the availability response should be quoted.
fn should_quote_service(service_name: &str, is_b2b: bool) -> bool {
    if service_name.contains(EXCLUDED_KEYWORD) {
        return false;
    }
    if service_name.to_lowercase().contains(B2B_KEYWORD) && !is_b2b {
        return false;
    }
    true
}

/// Availability response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    services: Vec<AvailableService>,
}

#[derive(Debug, Deserialize)]
struct AvailableService {
    /// Service identifier sent back on the quote request
    service: String,
    name: String,
}

/// Per-service quote response
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    services: Vec<QuotedService>,
}

#[derive(Debug, Deserialize)]
struct QuotedService {
    name: String,
    total: f64,
}

/// Interparcel rate client
#[derive(Clone)]
pub struct InterparcelClient {
    client: Client,
    base_url: String,
    session_cookie: String,
    from_city: String,
    from_postcode: String,
    token_provider: Arc<dyn TokenProvider>,
}

impl InterparcelClient {
    pub fn new(
        base_url: String,
        quote_page_url: String,
        session_cookie: String,
        from_city: String,
        from_postcode: String,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url,
            session_cookie,
            from_city,
            from_postcode,
            token_provider: Arc::new(QuotePageTokenProvider::new(quote_page_url)),
        }
    }

    /// Swap in a different token source (tests, future token API).
    pub fn with_token_provider(mut self, token_provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = token_provider;
        self
    }

    /// Run the full availability -> token -> quote flow.
    pub async fn rates(&self, request: &ShippingQuoteRequest) -> AppResult<Vec<ShippingOption>> {
        let package = PackageSpec::from_request(request);

        let available = self.availability(&package, request).await?;

        let quotable: Vec<&AvailableService> = available
            .iter()
            .filter(|s| should_quote_service(&s.name, request.is_b2b))
            .collect();

        if quotable.is_empty() {
            return Err(AppError::ShippingUnavailable(
                "Interparcel has no services for this package".to_string(),
            ));
        }

        let token = self.token_provider.csrf_token(&package, request).await?;

        // Fire every per-service quote at once and wait for all of them to
        // settle. A service that errors or comes back empty resolves to None
        // so the rest of the batch survives.
        let quotes = join_all(
            quotable
                .iter()
                .map(|service| self.quote_service(&package, request, service, &token)),
        )
        .await;

        let options: Vec<ShippingOption> = quotes
            .into_iter()
            .flatten()
            .take(MAX_SERVICES)
            .collect();

        if options.is_empty() {
            return Err(AppError::ShippingUnavailable(
                "No Interparcel service returned a quote".to_string(),
            ));
        }

        Ok(options)
    }

    async fn availability(
        &self,
        package: &PackageSpec,
        request: &ShippingQuoteRequest,
    ) -> AppResult<Vec<AvailableService>> {
        let url = format!(
            "{}/api/quote/availability?coll_city={}&coll_postcode={}&coll_country=AU&del_city={}&del_postcode={}&del_state={}&del_country={}&type={}&length={}&width={}&height={}&weight={}",
            self.base_url,
            self.from_city,
            self.from_postcode,
            request.destination_city.as_deref().unwrap_or(""),
            request.destination_postcode.as_deref().unwrap_or(""),
            request.destination_state.as_deref().unwrap_or(""),
            request.destination_country.to_uppercase(),
            package.kind,
            package.length_cm,
            package.width_cm,
            package.height_cm,
            package.weight_kg,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Provider {
                provider: "Interparcel".to_string(),
                message: format!("availability request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Provider {
                provider: "Interparcel".to_string(),
                message: format!("availability returned {}", status),
            });
        }

        let availability: AvailabilityResponse =
            response.json().await.map_err(|e| AppError::Provider {
                provider: "Interparcel".to_string(),
                message: format!("failed to parse availability response: {}", e),
            })?;

        if let Some(message) = availability.error_message {
            return Err(AppError::Provider {
                provider: "Interparcel".to_string(),
                message,
            });
        }

        Ok(availability.services)
    }

    /// Quote one service. Any failure resolves to None; the caller decides
    /// whether an all-None batch is fatal.
    async fn quote_service(
        &self,
        package: &PackageSpec,
        request: &ShippingQuoteRequest,
        service: &AvailableService,
        csrf_token: &str,
    ) -> Option<ShippingOption> {
        let params = [
            ("service", service.service.clone()),
            ("coll_city", self.from_city.clone()),
            ("coll_postcode", self.from_postcode.clone()),
            ("coll_country", "AU".to_string()),
            (
                "del_city",
                request.destination_city.clone().unwrap_or_default(),
            ),
            (
                "del_postcode",
                request.destination_postcode.clone().unwrap_or_default(),
            ),
            ("del_country", request.destination_country.to_uppercase()),
            ("type", package.kind.to_string()),
            ("length", package.length_cm.to_string()),
            ("width", package.width_cm.to_string()),
            ("height", package.height_cm.to_string()),
            ("weight", package.weight_kg.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/api/quote", self.base_url))
            .header("X-CSRF-TOKEN", csrf_token)
            .header("Cookie", &self.session_cookie)
            .form(&params)
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(service = %service.name, status = %r.status(), "Interparcel service quote rejected");
                return None;
            }
            Err(e) => {
                tracing::debug!(service = %service.name, error = %e, "Interparcel service quote failed");
                return None;
            }
        };

        let quote: QuoteResponse = match response.json().await {
            Ok(q) => q,
            Err(e) => {
                tracing::debug!(service = %service.name, error = %e, "Interparcel quote unparseable");
                return None;
            }
        };

        let quoted = quote.services.first()?;
        let amount = Decimal::from_f64_retain(quoted.total)?;
        let cents = cents_from_decimal_ceil(amount)?;

        Some(ShippingOption::new(quoted.name.clone(), cents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf_token() {
        let html = r#"<html><head><meta name="csrf-token" content="abc123DEF"></head></html>"#;
        assert_eq!(extract_csrf_token(html), Some("abc123DEF".to_string()));
    }

    #[test]
    fn test_extract_csrf_token_missing() {
        assert_eq!(extract_csrf_token("<html><head></head></html>"), None);
        let empty = r#"<meta name="csrf-token" content="">"#;
        assert_eq!(extract_csrf_token(empty), None);
    }

    #[test]
    fn test_pallet_sizing_over_threshold() {
        let request = ShippingQuoteRequest {
            weight_kg: Decimal::from(40),
            length_cm: Decimal::from(100),
            width_cm: Decimal::from(80),
            height_cm: Decimal::from(60),
            destination_country: "AU".to_string(),
            destination_postcode: Some("3180".to_string()),
            destination_city: None,
            destination_state: None,
            is_b2b: false,
        };
        let package = PackageSpec::from_request(&request);
        assert_eq!(package.kind, "pallet");
        assert_eq!(package.length_cm, Decimal::from(130));
        assert_eq!(package.width_cm, Decimal::from(110));
        assert_eq!(package.height_cm, Decimal::from(70));
    }

    #[test]
    fn test_parcel_sizing_at_threshold() {
        let request = ShippingQuoteRequest {
            weight_kg: Decimal::from(35),
            length_cm: Decimal::from(50),
            width_cm: Decimal::from(40),
            height_cm: Decimal::from(30),
            destination_country: "AU".to_string(),
            destination_postcode: Some("3180".to_string()),
            destination_city: None,
            destination_state: None,
            is_b2b: false,
        };
        let package = PackageSpec::from_request(&request);
        assert_eq!(package.kind, "parcel");
        assert_eq!(package.length_cm, Decimal::from(50));
    }

    #[test]
    fn test_service_filtering() {
        assert!(should_quote_service("TNT Road Express", false));
        assert!(!should_quote_service("Hunter Express", false));
        assert!(!should_quote_service("Allied B2B Freight", false));
        assert!(should_quote_service("Allied B2B Freight", true));
        assert!(!should_quote_service("Hunter b2b", true));
    }
}
