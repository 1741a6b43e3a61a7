//! The in-memory parsed listing (`ParsedVehicle`).

use serde::{Deserialize, Serialize};

/// A single listing as extracted in one pipeline run.
///
/// This type is intentionally ephemeral: it lives only for the duration of a
/// run and is never itself persisted (the reconciliation engine turns it into
/// `vehicle_history` rows and snapshot payloads).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParsedVehicle {
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub color: Option<String>,
    pub mileage: Option<i64>,
    pub price: Option<i64>,
    pub listing_url: Option<String>,
    pub primary_image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub image_date: Option<chrono::NaiveDate>,
}

impl ParsedVehicle {
    /// A parsed record is valid when it satisfies at least one of these.
    pub fn is_valid(&self) -> bool {
        self.has_valid_vin()
            || (self.year.is_some() && self.make.is_some())
            || (self.price.is_some() && self.year.is_some())
            || self.listing_url.is_some()
    }

    pub fn has_valid_vin(&self) -> bool {
        self.vin.as_deref().is_some_and(is_valid_vin)
    }
}

/// 17 characters from `[A-H J-N P R-Z 0-9]` (no I, O, Q, no lowercase).
pub fn is_valid_vin(vin: &str) -> bool {
    vin.len() == 17
        && vin
            .bytes()
            .all(|b| (b.is_ascii_digit() || b.is_ascii_uppercase()) && !matches!(b, b'I' | b'O' | b'Q'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vin_validity() {
        assert!(is_valid_vin("1HGCV1F30LA012345"));
        assert!(!is_valid_vin("1HGCV1F30LA01234")); // 16 chars
        assert!(!is_valid_vin("1HGCV1F30LA0123456")); // 18 chars
        assert!(!is_valid_vin("1HGCV1O30LA012345")); // contains O
    }

    #[test]
    fn valid_when_vin_present() {
        let v = ParsedVehicle {
            vin: Some("1HGCV1F30LA012345".to_string()),
            ..Default::default()
        };
        assert!(v.is_valid());
    }

    #[test]
    fn valid_when_year_and_make_present() {
        let v = ParsedVehicle {
            year: Some(2020),
            make: Some("Honda".to_string()),
            ..Default::default()
        };
        assert!(v.is_valid());
    }

    #[test]
    fn invalid_when_nothing_identifying() {
        let v = ParsedVehicle {
            color: Some("Red".to_string()),
            ..Default::default()
        };
        assert!(!v.is_valid());
    }
}
