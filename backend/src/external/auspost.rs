//! AusPost rate API client
//!
//! Queries the domestic and international parcel rate endpoints and
//! normalizes the returned services into `ShippingOption`s. Prices come back
//! as decimal strings and are converted to cents with a ceiling so the shop
//! is never undercharged by rounding.

use std::str::FromStr;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use crate::models::{ShippingOption, ShippingQuoteRequest};
use shared::types::cents_from_decimal_ceil;

use crate::error::{AppError, AppResult};

/// Domestic service tiers the storefront offers. Both must be present in the
/// rate response or the quote fails.
const DOMESTIC_SERVICES: [(&str, &str); 2] = [
    ("AUS_PARCEL_REGULAR", "AusPost Regular"),
    ("AUS_PARCEL_EXPRESS", "AusPost Express"),
];

/// International service names we list. Anything else in the response is
/// dropped without error.
const INTERNATIONAL_SERVICES: [&str; 2] = ["International Standard", "International Express"];

/// AusPost rate API client
#[derive(Clone)]
pub struct AusPostClient {
    client: Client,
    api_key: String,
    from_postcode: String,
    base_url: String,
}

/// AusPost rate API response envelope
#[derive(Debug, Deserialize)]
struct RateResponse {
    services: ServiceList,
}

#[derive(Debug, Deserialize)]
struct ServiceList {
    service: Vec<RateService>,
}

#[derive(Debug, Deserialize)]
struct RateService {
    code: String,
    name: String,
    price: String,
}

impl AusPostClient {
    /// Create a new AusPostClient
    pub fn new(api_key: String, from_postcode: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from_postcode,
            base_url: "https://digitalapi.auspost.com.au".to_string(),
        }
    }

    /// Create a new AusPostClient with custom base URL (for testing)
    pub fn with_base_url(api_key: String, from_postcode: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from_postcode,
            base_url,
        }
    }

    /// Fetch domestic parcel rates: exactly the regular and express tiers.
    ///
    /// Fails with `ShippingUnavailable` when either tier is missing from the
    /// response, since the storefront always presents both.
    pub async fn domestic_rates(
        &self,
        request: &ShippingQuoteRequest,
    ) -> AppResult<Vec<ShippingOption>> {
        let to_postcode = request
            .destination_postcode
            .as_deref()
            .ok_or_else(|| AppError::Validation {
                field: "destination_postcode".to_string(),
                message: "Domestic quotes require a destination postcode".to_string(),
            })?;

        let url = format!(
            "{}/postage/parcel/domestic/service.json?from_postcode={}&to_postcode={}&length={}&width={}&height={}&weight={}",
            self.base_url,
            self.from_postcode,
            to_postcode,
            request.length_cm,
            request.width_cm,
            request.height_cm,
            request.weight_kg
        );

        let response: RateResponse = self.get_rates(&url).await?;

        let mut options = Vec::with_capacity(DOMESTIC_SERVICES.len());
        for (code, display_name) in DOMESTIC_SERVICES {
            let service = response
                .services
                .service
                .iter()
                .find(|s| s.code == code)
                .ok_or_else(|| {
                    AppError::ShippingUnavailable(format!(
                        "AusPost did not return service {}",
                        code
                    ))
                })?;
            options.push(ShippingOption::new(display_name, parse_price(&service.price)?));
        }

        Ok(options)
    }

    /// Fetch international parcel rates filtered to the supported services.
    pub async fn international_rates(
        &self,
        request: &ShippingQuoteRequest,
    ) -> AppResult<Vec<ShippingOption>> {
        let url = format!(
            "{}/postage/parcel/international/service.json?country_code={}&weight={}",
            self.base_url,
            request.destination_country.to_uppercase(),
            request.weight_kg
        );

        let response: RateResponse = self.get_rates(&url).await?;

        let mut options = Vec::new();
        for service in &response.services.service {
            if INTERNATIONAL_SERVICES.contains(&service.name.as_str()) {
                options.push(ShippingOption::new(
                    format!("AusPost {}", service.name),
                    parse_price(&service.price)?,
                ));
            }
        }

        if options.is_empty() {
            return Err(AppError::ShippingUnavailable(
                "AusPost returned no supported international services".to_string(),
            ));
        }

        Ok(options)
    }

    async fn get_rates(&self, url: &str) -> AppResult<RateResponse> {
        let response = self
            .client
            .get(url)
            .header("AUTH-KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Provider {
                provider: "AusPost".to_string(),
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider {
                provider: "AusPost".to_string(),
                message: format!("{} - {}", status, body),
            });
        }

        response.json().await.map_err(|e| AppError::Provider {
            provider: "AusPost".to_string(),
            message: format!("failed to parse rate response: {}", e),
        })
    }
}

/// Parse a decimal price string into cents, rounding up.
fn parse_price(price: &str) -> AppResult<i64> {
    let amount = Decimal::from_str(price).map_err(|_| AppError::Provider {
        provider: "AusPost".to_string(),
        message: format!("unparseable price: {}", price),
    })?;
    cents_from_decimal_ceil(amount).ok_or_else(|| AppError::Provider {
        provider: "AusPost".to_string(),
        message: format!("price out of range: {}", price),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_parsing_rounds_up() {
        assert_eq!(parse_price("10.60").unwrap(), 1060);
        assert_eq!(parse_price("10.601").unwrap(), 1061);
        assert_eq!(parse_price("0.01").unwrap(), 1);
    }

    #[test]
    fn test_unparseable_price_is_provider_error() {
        assert!(matches!(
            parse_price("free"),
            Err(AppError::Provider { .. })
        ));
    }
}
