//! Shipping quote contracts and carrier routing policy
//!
//! The routing rules mirror real carrier acceptance limits: light/small
//! parcels go through the postal network, heavy or oversized freight goes
//! through the Interparcel broker. Synthetic options (pickup, the admin
//! placeholder rate) are injected by policy and never depend on carrier
//! uptime.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum number of options ever shown at checkout, synthetic entries
/// included. Display cap, not a ranking.
pub const MAX_QUOTE_OPTIONS: usize = 4;

/// At or above this weight every carrier except Interparcel refuses the job.
pub fn heavy_freight_threshold_kg() -> Decimal {
    Decimal::from(20)
}

/// AusPost rejects parcels with any side at or beyond this length.
pub fn postal_max_dimension_cm() -> Decimal {
    Decimal::from(105)
}

/// Physical package attributes and destination for one quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingQuoteRequest {
    pub weight_kg: Decimal,
    pub length_cm: Decimal,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
    /// ISO 3166-1 alpha-2 country code
    pub destination_country: String,
    pub destination_postcode: Option<String>,
    pub destination_city: Option<String>,
    pub destination_state: Option<String>,
    #[serde(default)]
    pub is_b2b: bool,
}

impl ShippingQuoteRequest {
    pub fn is_domestic(&self) -> bool {
        self.destination_country.eq_ignore_ascii_case("AU")
    }

    /// Whether all three dimensions fit AusPost's size limit.
    pub fn fits_postal_dimensions(&self) -> bool {
        let max = postal_max_dimension_cm();
        self.length_cm < max && self.width_cm < max && self.height_cm < max
    }

    pub fn is_heavy_freight(&self) -> bool {
        self.weight_kg >= heavy_freight_threshold_kg()
    }
}

/// One selectable shipping choice. The first option in a list is the
/// default-selected one, so order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub display_name: String,
    pub amount_cents: i64,
    pub currency: String,
}

impl ShippingOption {
    pub fn new(display_name: impl Into<String>, amount_cents: i64) -> Self {
        Self {
            display_name: display_name.into(),
            amount_cents,
            currency: crate::types::CURRENCY_AUD.to_string(),
        }
    }

    /// Zero-cost pickup from the yard. Domestic destinations only.
    pub fn pickup() -> Self {
        Self::new("Pickup", 0)
    }

    /// Nominal placeholder rate for manually priced admin orders.
    pub fn admin_placeholder() -> Self {
        Self::new("Admin Shipping", 1)
    }
}

/// Which carrier(s) to query for a request, decided before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePlan {
    /// weight >= 20 kg: Interparcel regardless of destination or size
    HeavyFreight,
    /// International, all dimensions within postal limits: AusPost
    InternationalPost,
    /// International oversized: Interparcel
    InternationalFreight,
    /// Domestic parcel: AusPost mandatory, Interparcel best-effort
    DomesticPost,
    /// Domestic oversized: Interparcel only
    DomesticFreight,
}

/// Routing policy, evaluated in order: weight class first, then destination,
/// then dimensions.
pub fn plan_route(request: &ShippingQuoteRequest) -> RatePlan {
    if request.is_heavy_freight() {
        return RatePlan::HeavyFreight;
    }
    if !request.is_domestic() {
        if request.fits_postal_dimensions() {
            return RatePlan::InternationalPost;
        }
        return RatePlan::InternationalFreight;
    }
    if request.fits_postal_dimensions() {
        RatePlan::DomesticPost
    } else {
        RatePlan::DomesticFreight
    }
}

/// Inject synthetic options and apply the display cap.
///
/// Heavy freight appends pickup after the carrier rates (freight is the
/// realistic default there); domestic parcels lead with pickup. The admin
/// placeholder, when present, always sits first. Synthetic entries count
/// toward the cap.
pub fn finalize_options(
    plan: RatePlan,
    carrier_options: Vec<ShippingOption>,
    destination_is_domestic: bool,
    is_admin: bool,
) -> Vec<ShippingOption> {
    let mut options = carrier_options;

    match plan {
        RatePlan::HeavyFreight => {
            if destination_is_domestic {
                options.push(ShippingOption::pickup());
            }
        }
        RatePlan::DomesticPost | RatePlan::DomesticFreight => {
            options.insert(0, ShippingOption::pickup());
        }
        RatePlan::InternationalPost | RatePlan::InternationalFreight => {}
    }

    if is_admin {
        options.insert(0, ShippingOption::admin_placeholder());
    }

    options.truncate(MAX_QUOTE_OPTIONS);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(weight: i64, dims: (i64, i64, i64), country: &str) -> ShippingQuoteRequest {
        ShippingQuoteRequest {
            weight_kg: Decimal::from(weight),
            length_cm: Decimal::from(dims.0),
            width_cm: Decimal::from(dims.1),
            height_cm: Decimal::from(dims.2),
            destination_country: country.to_string(),
            destination_postcode: None,
            destination_city: None,
            destination_state: None,
            is_b2b: false,
        }
    }

    #[test]
    fn test_heavy_freight_wins_over_destination() {
        assert_eq!(plan_route(&request(20, (10, 10, 10), "AU")), RatePlan::HeavyFreight);
        assert_eq!(plan_route(&request(50, (10, 10, 10), "NZ")), RatePlan::HeavyFreight);
    }

    #[test]
    fn test_international_routing_by_dimensions() {
        assert_eq!(plan_route(&request(5, (50, 40, 30), "NZ")), RatePlan::InternationalPost);
        assert_eq!(plan_route(&request(5, (120, 40, 30), "NZ")), RatePlan::InternationalFreight);
    }

    #[test]
    fn test_domestic_routing_by_dimensions() {
        assert_eq!(plan_route(&request(5, (50, 40, 30), "AU")), RatePlan::DomesticPost);
        assert_eq!(plan_route(&request(5, (105, 40, 30), "AU")), RatePlan::DomesticFreight);
    }

    #[test]
    fn test_lowercase_country_is_domestic() {
        assert!(request(5, (10, 10, 10), "au").is_domestic());
    }

    #[test]
    fn test_domestic_parcel_leads_with_pickup() {
        let carrier = vec![
            ShippingOption::new("AusPost Regular", 1200),
            ShippingOption::new("AusPost Express", 1800),
        ];
        let options = finalize_options(RatePlan::DomesticPost, carrier, true, false);
        assert_eq!(options[0], ShippingOption::pickup());
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn test_heavy_freight_appends_pickup_for_au_only() {
        let carrier = vec![ShippingOption::new("Allied Express", 9900)];
        let au = finalize_options(RatePlan::HeavyFreight, carrier.clone(), true, false);
        assert_eq!(au.last().unwrap(), &ShippingOption::pickup());

        let intl = finalize_options(RatePlan::HeavyFreight, carrier, false, false);
        assert!(intl.iter().all(|o| o.display_name != "Pickup"));
    }

    #[test]
    fn test_admin_placeholder_is_first_and_cap_holds() {
        let carrier = vec![
            ShippingOption::new("AusPost Regular", 1200),
            ShippingOption::new("AusPost Express", 1800),
            ShippingOption::new("Couriers Please", 1500),
        ];
        let options = finalize_options(RatePlan::DomesticPost, carrier, true, true);
        assert_eq!(options[0], ShippingOption::admin_placeholder());
        assert_eq!(options.len(), MAX_QUOTE_OPTIONS);
    }
}
