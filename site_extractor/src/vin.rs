//! VIN enrichment via the external decode service.

use std::time::Duration;

use serde::Deserialize;

use crate::model::{is_valid_vin, ParsedVehicle};

/// Fields the decode service can fill in.
#[derive(Debug, Clone, Default)]
pub struct DecodedVin {
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DecodeResponse {
    #[serde(rename = "Results")]
    results: Vec<DecodeRow>,
}

#[derive(Debug, Deserialize)]
struct DecodeRow {
    #[serde(rename = "Variable")]
    variable: String,
    #[serde(rename = "Value")]
    value: Option<String>,
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client over the external VIN decode API: one 17-char VIN in, a
/// best-effort `{year, make, model, trim}` out. A single 10s attempt, no
/// retries — absence of the service degrades to `None`, never an error the
/// pipeline has to propagate.
pub struct VinClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl VinClient {
    pub fn new(http: reqwest::Client, endpoint: String) -> Self {
        Self {
            http,
            endpoint,
            timeout: Duration::from_secs(10),
        }
    }

    /// Decode a VIN. Returns `None` for malformed input or any transport/parse failure.
    pub async fn decode(&self, vin: &str) -> Option<DecodedVin> {
        if !is_valid_vin(vin) {
            return None;
        }

        let url = format!("{}/{vin}?format=json", self.endpoint);
        let resp = self.http.get(&url).timeout(self.timeout).send().await.ok()?;
        let parsed: DecodeResponse = resp.json().await.ok()?;

        let find = |name: &str| {
            parsed
                .results
                .iter()
                .find(|r| r.variable == name)
                .and_then(|r| r.value.clone())
                .filter(|v| !v.is_empty())
        };

        Some(DecodedVin {
            year: find("Model Year").and_then(|v| v.parse().ok()),
            make: find("Make").map(|v| title_case(&v)),
            model: find("Model").map(|v| title_case(&v)),
            trim: find("Trim").map(|v| title_case(&v)),
        })
    }
}

/// Pure merge: only fields missing on `vehicle` are overwritten by `decoded`.
/// Present fields are never replaced.
pub fn enrich(vehicle: &mut ParsedVehicle, decoded: &DecodedVin) {
    if vehicle.year.is_none() {
        vehicle.year = decoded.year;
    }
    if vehicle.make.is_none() {
        vehicle.make = decoded.make.clone();
    }
    if vehicle.model.is_none() {
        vehicle.model = decoded.model.clone();
    }
    if vehicle.trim.is_none() {
        vehicle.trim = decoded.trim.clone();
    }
}
