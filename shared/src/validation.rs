//! Validation utilities for the Wreckyard storefront
//!
//! Includes Australia-specific checks for shipping destinations.

use rust_decimal::Decimal;

use crate::models::ShippingQuoteRequest;

/// Validate a shipping quote request has usable physical attributes.
pub fn validate_quote_request(request: &ShippingQuoteRequest) -> Result<(), &'static str> {
    if request.weight_kg <= Decimal::ZERO {
        return Err("Weight must be positive");
    }
    if request.length_cm <= Decimal::ZERO
        || request.width_cm <= Decimal::ZERO
        || request.height_cm <= Decimal::ZERO
    {
        return Err("All dimensions must be positive");
    }
    validate_country_code(&request.destination_country)?;
    if request.is_domestic() {
        match request.destination_postcode.as_deref() {
            Some(postcode) => validate_au_postcode(postcode)?,
            None => return Err("Domestic quotes require a destination postcode"),
        }
    }
    Ok(())
}

/// Australian postcodes are exactly four digits.
pub fn validate_au_postcode(postcode: &str) -> Result<(), &'static str> {
    if postcode.len() == 4 && postcode.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("Invalid Australian postcode")
    }
}

/// ISO 3166-1 alpha-2: two ASCII letters.
pub fn validate_country_code(code: &str) -> Result<(), &'static str> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err("Invalid country code")
    }
}

/// Order line quantities must be at least one.
pub fn validate_order_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity >= 1 {
        Ok(())
    } else {
        Err("Quantity must be at least 1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> ShippingQuoteRequest {
        ShippingQuoteRequest {
            weight_kg: Decimal::from(5),
            length_cm: Decimal::from(20),
            width_cm: Decimal::from(15),
            height_cm: Decimal::from(10),
            destination_country: "AU".to_string(),
            destination_postcode: Some("3180".to_string()),
            destination_city: None,
            destination_state: None,
            is_b2b: false,
        }
    }

    #[test]
    fn test_valid_domestic_request() {
        assert!(validate_quote_request(&base_request()).is_ok());
    }

    #[test]
    fn test_zero_weight_rejected() {
        let mut request = base_request();
        request.weight_kg = Decimal::ZERO;
        assert!(validate_quote_request(&request).is_err());
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut request = base_request();
        request.height_cm = Decimal::from(-3);
        assert!(validate_quote_request(&request).is_err());
    }

    #[test]
    fn test_domestic_without_postcode_rejected() {
        let mut request = base_request();
        request.destination_postcode = None;
        assert!(validate_quote_request(&request).is_err());
    }

    #[test]
    fn test_international_without_postcode_accepted() {
        let mut request = base_request();
        request.destination_country = "NZ".to_string();
        request.destination_postcode = None;
        assert!(validate_quote_request(&request).is_ok());
    }

    #[test]
    fn test_au_postcodes() {
        assert!(validate_au_postcode("3180").is_ok());
        assert!(validate_au_postcode("0800").is_ok());
        assert!(validate_au_postcode("318").is_err());
        assert!(validate_au_postcode("31805").is_err());
        assert!(validate_au_postcode("3a80").is_err());
    }

    #[test]
    fn test_country_codes() {
        assert!(validate_country_code("AU").is_ok());
        assert!(validate_country_code("nz").is_ok());
        assert!(validate_country_code("AUS").is_err());
        assert!(validate_country_code("A1").is_err());
    }

    #[test]
    fn test_order_quantity() {
        assert!(validate_order_quantity(1).is_ok());
        assert!(validate_order_quantity(0).is_err());
        assert!(validate_order_quantity(-2).is_err());
    }
}
