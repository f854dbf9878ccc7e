//! Shipping rate aggregation service
//!
//! Resolves which carriers to quote for a package, fans the calls out, and
//! assembles the final option list the checkout presents. Policy rules are
//! pure functions in the shared crate; this service only does the I/O around
//! them.

use crate::models::{finalize_options, plan_route, RatePlan, ShippingOption, ShippingQuoteRequest};
use shared::validation::validate_quote_request;

use crate::error::{AppError, AppResult};
use crate::external::{AusPostClient, InterparcelClient};
use crate::Config;

/// Shipping rate aggregation service
#[derive(Clone)]
pub struct ShippingService {
    auspost: AusPostClient,
    interparcel: InterparcelClient,
}

impl ShippingService {
    /// Create a ShippingService with clients built from configuration
    pub fn new(config: &Config) -> Self {
        let auspost = AusPostClient::with_base_url(
            config.auspost.api_key.clone(),
            config.auspost.from_postcode.clone(),
            config.auspost.base_url.clone(),
        );
        let interparcel = InterparcelClient::new(
            config.interparcel.base_url.clone(),
            config.interparcel.quote_page_url.clone(),
            config.interparcel.session_cookie.clone(),
            config.interparcel.from_city.clone(),
            config.interparcel.from_postcode.clone(),
        );
        Self {
            auspost,
            interparcel,
        }
    }

    /// Create with explicit clients (tests)
    pub fn with_clients(auspost: AusPostClient, interparcel: InterparcelClient) -> Self {
        Self {
            auspost,
            interparcel,
        }
    }

    /// Resolve the shipping options for a package and destination.
    ///
    /// Adapter failures propagate to the caller — checkout has no fallback
    /// rate — except on the domestic-parcel path, where Interparcel is a
    /// bonus on top of AusPost and its failure is only logged.
    pub async fn get_shipping_services(
        &self,
        request: &ShippingQuoteRequest,
        is_admin: bool,
    ) -> AppResult<Vec<ShippingOption>> {
        validate_quote_request(request).map_err(|message| AppError::Validation {
            field: "shipping_quote".to_string(),
            message: message.to_string(),
        })?;

        let plan = plan_route(request);

        let carrier_options = match plan {
            RatePlan::HeavyFreight
            | RatePlan::InternationalFreight
            | RatePlan::DomesticFreight => self.interparcel.rates(request).await?,
            RatePlan::InternationalPost => self.auspost.international_rates(request).await?,
            RatePlan::DomesticPost => {
                // Both carriers in flight at once. AusPost alone is enough to
                // serve this path, so only its failure is fatal.
                let (auspost_result, interparcel_result) = tokio::join!(
                    self.auspost.domestic_rates(request),
                    self.interparcel.rates(request)
                );

                let mut options = auspost_result?;
                match interparcel_result {
                    Ok(extra) => options.extend(extra),
                    Err(e) => {
                        tracing::warn!(error = %e, "Interparcel unavailable for domestic quote, continuing with AusPost only");
                    }
                }
                options
            }
        };

        Ok(finalize_options(
            plan,
            carrier_options,
            request.is_domestic(),
            is_admin,
        ))
    }
}
