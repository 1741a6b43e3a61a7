//! External Extractor Clients: the primary/secondary/HTML-fallback cascade.
//!
//! The three-step cascade is deterministic and non-merging — the first tier
//! to return a non-empty vehicle set wins, exactly once per candidate
//! inventory URL, not per vehicle ("cascading extractors, not voting").

pub mod errors;
pub mod remote;

use std::time::Duration;

use crate::errors::{ExtractError, Result};
use crate::fetch::{FetchOptions, Fetcher};
use crate::model::ParsedVehicle;
use remote::Confidence;

/// Which tier ultimately produced the vehicles, mirrors the response envelope's `scraper_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScraperMethod {
    Primary,
    Secondary,
    HtmlParser,
}

/// Endpoints for the two remote renderer tiers; absent means "skip that tier".
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    pub primary_url: Option<String>,
    pub secondary_url: Option<String>,
    pub timeout: Duration,
}

impl ExtractorConfig {
    pub fn new(primary_url: Option<String>, secondary_url: Option<String>) -> Self {
        Self {
            primary_url,
            secondary_url,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Result of running the full cascade against one candidate inventory URL.
pub struct ExtractionOutcome {
    pub vehicles: Vec<ParsedVehicle>,
    pub method: ScraperMethod,
    pub tier: Option<String>,
    pub confidence: Option<Confidence>,
}

/// Run the cascade: primary renderer, then secondary, then direct HTML fetch.
pub async fn extract(
    http: &reqwest::Client,
    fetcher: &Fetcher,
    config: &ExtractorConfig,
    url: &str,
) -> Result<ExtractionOutcome> {
    if let Some(endpoint) = &config.primary_url {
        match remote::call(http, endpoint, url, config.timeout).await {
            Ok(Some(result)) => {
                return Ok(ExtractionOutcome {
                    vehicles: result.vehicles,
                    method: ScraperMethod::Primary,
                    tier: result.tier,
                    confidence: result.confidence,
                });
            }
            Ok(None) => tracing::debug!(url, "primary renderer returned no vehicles"),
            Err(e) => tracing::warn!(url, error = %e, "primary renderer failed"),
        }
    }

    if let Some(endpoint) = &config.secondary_url {
        match remote::call(http, endpoint, url, config.timeout).await {
            Ok(Some(result)) => {
                return Ok(ExtractionOutcome {
                    vehicles: result.vehicles,
                    method: ScraperMethod::Secondary,
                    tier: result.tier,
                    confidence: result.confidence,
                });
            }
            Ok(None) => tracing::debug!(url, "secondary renderer returned no vehicles"),
            Err(e) => tracing::warn!(url, error = %e, "secondary renderer failed"),
        }
    }

    let fetch_result = fetcher.fetch(url, &FetchOptions::default()).await;
    let Some(body) = fetch_result.body else {
        return Err(ExtractError::RendererUnavailable { url: url.to_string() });
    };
    let vehicles = crate::html::parse(&body, url);
    if vehicles.is_empty() {
        return Err(ExtractError::ParseNoVehicles { url: url.to_string() });
    }

    Ok(ExtractionOutcome {
        vehicles,
        method: ScraperMethod::HtmlParser,
        tier: None,
        confidence: None,
    })
}
