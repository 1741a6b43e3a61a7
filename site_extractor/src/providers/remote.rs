//! The remote-renderer request/response contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ProviderError;
use crate::model::ParsedVehicle;

#[derive(Debug, Serialize)]
struct RendererRequest<'a> {
    url: &'a str,
    #[serde(rename = "useCachedPattern", skip_serializing_if = "Option::is_none")]
    use_cached_pattern: Option<bool>,
    #[serde(rename = "maxPages", skip_serializing_if = "Option::is_none")]
    max_pages: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Deserialize)]
struct RendererVehicle {
    year: Option<i32>,
    make: Option<String>,
    model: Option<String>,
    price: Option<i64>,
    mileage: Option<i64>,
    vin: Option<String>,
    stock_number: Option<String>,
    image_url: Option<String>,
    detail_url: Option<String>,
    color: Option<String>,
    trim: Option<String>,
}

impl From<RendererVehicle> for ParsedVehicle {
    fn from(v: RendererVehicle) -> Self {
        ParsedVehicle {
            vin: v.vin,
            stock_number: v.stock_number,
            year: v.year,
            make: v.make,
            model: v.model,
            trim: v.trim,
            color: v.color,
            mileage: v.mileage,
            price: v.price,
            listing_url: v.detail_url,
            primary_image_url: v.image_url,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RendererResponse {
    success: bool,
    #[serde(default)]
    vehicles: Vec<RendererVehicle>,
    tier: Option<String>,
    confidence: Option<Confidence>,
}

/// Outcome of one successful remote-renderer call.
pub struct RemoteResult {
    pub vehicles: Vec<ParsedVehicle>,
    pub tier: Option<String>,
    pub confidence: Option<Confidence>,
}

/// POST `{url}` to `endpoint` and return its vehicles, or `None` when the
/// endpoint reported `success=false` or an empty `vehicles` array (the
/// cascade's "try the next tier" signal, not an error).
pub async fn call(
    client: &reqwest::Client,
    endpoint: &str,
    url: &str,
    timeout: Duration,
) -> Result<Option<RemoteResult>, ProviderError> {
    let body = RendererRequest {
        url,
        use_cached_pattern: Some(true),
        max_pages: None,
    };

    let resp = client.post(endpoint).json(&body).timeout(timeout).send().await?;
    let parsed: RendererResponse = resp.json().await?;

    if !parsed.success || parsed.vehicles.is_empty() {
        return Ok(None);
    }

    Ok(Some(RemoteResult {
        vehicles: parsed.vehicles.into_iter().map(ParsedVehicle::from).collect(),
        tier: parsed.tier,
        confidence: parsed.confidence,
    }))
}
