//! Shipping quote tests
//!
//! Covers the carrier routing policy, synthetic option injection, the
//! display cap, and minor-unit price conversion.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    finalize_options, plan_route, RatePlan, ShippingOption, ShippingQuoteRequest,
    MAX_QUOTE_OPTIONS,
};
use shared::types::cents_from_decimal_ceil;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn quote_request(weight: &str, dims: (&str, &str, &str), country: &str) -> ShippingQuoteRequest {
    ShippingQuoteRequest {
        weight_kg: dec(weight),
        length_cm: dec(dims.0),
        width_cm: dec(dims.1),
        height_cm: dec(dims.2),
        destination_country: country.to_string(),
        destination_postcode: Some("3180".to_string()),
        destination_city: None,
        destination_state: None,
        is_b2b: false,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Ceiling conversion: a fraction of a cent always rounds against the
    /// customer walking away with free freight.
    #[test]
    fn test_price_conversion_is_ceiling() {
        assert_eq!(cents_from_decimal_ceil(dec("17.35")), Some(1735));
        assert_eq!(cents_from_decimal_ceil(dec("17.351")), Some(1736));
        assert_eq!(cents_from_decimal_ceil(dec("17.359")), Some(1736));
        assert_eq!(cents_from_decimal_ceil(dec("0.001")), Some(1));
    }

    /// Twenty kilograms is the hard cutover to freight.
    #[test]
    fn test_heavy_packages_route_to_freight_only() {
        assert_eq!(
            plan_route(&quote_request("20", ("10", "10", "10"), "AU")),
            RatePlan::HeavyFreight
        );
        assert_eq!(
            plan_route(&quote_request("20", ("10", "10", "10"), "US")),
            RatePlan::HeavyFreight
        );
        assert_eq!(
            plan_route(&quote_request("19.999", ("10", "10", "10"), "AU")),
            RatePlan::DomesticPost
        );
    }

    /// International parcels use the postal network only when every side
    /// fits the 105 cm limit.
    #[test]
    fn test_international_routing() {
        assert_eq!(
            plan_route(&quote_request("5", ("104.9", "50", "20"), "NZ")),
            RatePlan::InternationalPost
        );
        assert_eq!(
            plan_route(&quote_request("5", ("105", "50", "20"), "NZ")),
            RatePlan::InternationalFreight
        );
    }

    /// Small domestic parcel: checkout sees pickup, then the two AusPost
    /// tiers, with the broker quotes filling the rest of the cap.
    #[test]
    fn test_domestic_parcel_scenario() {
        let request = quote_request("5", ("20", "15", "10"), "AU");
        let plan = plan_route(&request);
        assert_eq!(plan, RatePlan::DomesticPost);

        let carrier_options = vec![
            ShippingOption::new("AusPost Regular", 1060),
            ShippingOption::new("AusPost Express", 1410),
            ShippingOption::new("Couriers Please", 985),
        ];
        let options = finalize_options(plan, carrier_options, true, false);

        assert!(options.len() <= MAX_QUOTE_OPTIONS);
        assert_eq!(options[0], ShippingOption::pickup());
        assert_eq!(options[1].display_name, "AusPost Regular");
        assert_eq!(options[2].display_name, "AusPost Express");
        assert!(options.iter().all(|o| o.display_name != "Admin Shipping"));
    }

    /// Same scenario for an admin: the one-cent placeholder leads and the
    /// cap still holds.
    #[test]
    fn test_domestic_parcel_scenario_as_admin() {
        let request = quote_request("5", ("20", "15", "10"), "AU");
        let plan = plan_route(&request);

        let carrier_options = vec![
            ShippingOption::new("AusPost Regular", 1060),
            ShippingOption::new("AusPost Express", 1410),
            ShippingOption::new("Couriers Please", 985),
        ];
        let options = finalize_options(plan, carrier_options, true, true);

        assert_eq!(options.len(), MAX_QUOTE_OPTIONS);
        assert_eq!(options[0], ShippingOption::admin_placeholder());
        assert_eq!(options[0].amount_cents, 1);
        assert_eq!(options[1], ShippingOption::pickup());
    }

    /// Pickup is appended after freight rates for heavy domestic shipments
    /// and never offered internationally.
    #[test]
    fn test_pickup_only_for_domestic() {
        let freight = vec![ShippingOption::new("Allied Road", 18500)];

        let domestic = finalize_options(RatePlan::HeavyFreight, freight.clone(), true, false);
        assert_eq!(domestic.last().unwrap(), &ShippingOption::pickup());

        let international = finalize_options(RatePlan::InternationalFreight, freight, false, false);
        assert!(international.iter().all(|o| o.display_name != "Pickup"));
    }

    /// One bad per-service quote must not sink the batch: survivors pass
    /// through in provider order, capped for display.
    #[test]
    fn test_per_service_isolation_semantics() {
        let settled: Vec<Option<ShippingOption>> = vec![
            Some(ShippingOption::new("TNT Road", 2100)),
            None, // this service timed out
            Some(ShippingOption::new("Aramex", 1950)),
            None, // this one came back empty
            Some(ShippingOption::new("Allied Road", 2600)),
        ];

        let survivors: Vec<ShippingOption> = settled
            .into_iter()
            .flatten()
            .take(MAX_QUOTE_OPTIONS)
            .collect();

        assert_eq!(survivors.len(), 3);
        assert_eq!(survivors[0].display_name, "TNT Road");
        assert_eq!(survivors[2].display_name, "Allied Road");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for package weights in tenths of a kilogram (0.1 - 100.0)
    fn weight_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1000i64).prop_map(|n| Decimal::new(n, 1))
    }

    /// Strategy for dimensions in whole centimetres
    fn dimension_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=300i64).prop_map(Decimal::from)
    }

    /// Strategy for destination countries, biased toward AU
    fn country_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("AU".to_string()),
            Just("NZ".to_string()),
            Just("US".to_string()),
            Just("GB".to_string()),
        ]
    }

    /// Strategy for carrier result lists of varying size
    fn carrier_options_strategy() -> impl Strategy<Value = Vec<ShippingOption>> {
        prop::collection::vec((1i64..=100_000i64).prop_map(|cents| {
            ShippingOption::new(format!("Carrier {}", cents % 7), cents)
        }), 0..8)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Decimal prices never round down when converted to cents.
        #[test]
        fn prop_ceiling_never_undercharges(units in 0i64..100_000i64, thousandths in 0i64..1000i64) {
            let price = Decimal::from(units) + Decimal::new(thousandths, 3);
            let cents = cents_from_decimal_ceil(price).unwrap();
            prop_assert!(Decimal::from(cents) >= price * Decimal::from(100));
            // Never more than one whole cent above
            prop_assert!(Decimal::from(cents) < price * Decimal::from(100) + Decimal::from(1));
        }

        /// At or above 20 kg the route is freight-only, whatever the
        /// destination or size.
        #[test]
        fn prop_heavy_weight_always_freight(
            weight in (200i64..=1000i64).prop_map(|n| Decimal::new(n, 1)),
            length in dimension_strategy(),
            width in dimension_strategy(),
            height in dimension_strategy(),
            country in country_strategy()
        ) {
            let mut request = quote_request("5", ("10", "10", "10"), &country);
            request.weight_kg = weight;
            request.length_cm = length;
            request.width_cm = width;
            request.height_cm = height;
            prop_assert_eq!(plan_route(&request), RatePlan::HeavyFreight);
        }

        /// The assembled option list never exceeds the display cap.
        #[test]
        fn prop_option_cap_holds(
            weight in weight_strategy(),
            length in dimension_strategy(),
            width in dimension_strategy(),
            height in dimension_strategy(),
            country in country_strategy(),
            carrier_options in carrier_options_strategy(),
            is_admin in any::<bool>()
        ) {
            let mut request = quote_request("5", ("10", "10", "10"), &country);
            request.weight_kg = weight;
            request.length_cm = length;
            request.width_cm = width;
            request.height_cm = height;

            let plan = plan_route(&request);
            let options = finalize_options(plan, carrier_options, request.is_domestic(), is_admin);
            prop_assert!(options.len() <= MAX_QUOTE_OPTIONS);
        }

        /// Exactly one zero-cost pickup option for domestic destinations;
        /// none for international.
        #[test]
        fn prop_pickup_injection(
            weight in weight_strategy(),
            length in dimension_strategy(),
            width in dimension_strategy(),
            height in dimension_strategy(),
            country in country_strategy(),
            carrier_options in prop::collection::vec(
                (1i64..=100_000i64).prop_map(|cents| ShippingOption::new("Carrier", cents)),
                0..3
            )
        ) {
            let mut request = quote_request("5", ("10", "10", "10"), &country);
            request.weight_kg = weight;
            request.length_cm = length;
            request.width_cm = width;
            request.height_cm = height;

            let plan = plan_route(&request);
            let options = finalize_options(plan, carrier_options, request.is_domestic(), false);
            let pickups = options
                .iter()
                .filter(|o| o.display_name == "Pickup" && o.amount_cents == 0)
                .count();

            if request.is_domestic() {
                prop_assert_eq!(pickups, 1);
            } else {
                prop_assert_eq!(pickups, 0);
            }
        }

        /// The admin placeholder is always the first (default-selected)
        /// option when present, and absent otherwise.
        #[test]
        fn prop_admin_placeholder_position(
            country in country_strategy(),
            carrier_options in carrier_options_strategy(),
            is_admin in any::<bool>()
        ) {
            let request = quote_request("5", ("10", "10", "10"), &country);
            let plan = plan_route(&request);
            let options = finalize_options(plan, carrier_options, request.is_domestic(), is_admin);

            let admin_count = options
                .iter()
                .filter(|o| o.display_name == "Admin Shipping")
                .count();

            if is_admin {
                prop_assert_eq!(admin_count, 1);
                prop_assert_eq!(&options[0], &ShippingOption::admin_placeholder());
            } else {
                prop_assert_eq!(admin_count, 0);
            }
        }

        /// Per-service isolation: with N settled quotes of which K failed,
        /// exactly min(N - K, cap) survive.
        #[test]
        fn prop_isolation_counts(outcomes in prop::collection::vec(any::<bool>(), 0..10)) {
            let settled: Vec<Option<ShippingOption>> = outcomes
                .iter()
                .map(|ok| ok.then(|| ShippingOption::new("Carrier", 1000)))
                .collect();
            let succeeded = outcomes.iter().filter(|ok| **ok).count();

            let survivors: Vec<ShippingOption> =
                settled.into_iter().flatten().take(MAX_QUOTE_OPTIONS).collect();

            prop_assert_eq!(survivors.len(), succeeded.min(MAX_QUOTE_OPTIONS));
        }
    }
}
