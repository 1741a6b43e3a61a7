//! The per-tenant inventory pipeline.
//!
//! One call to [`run_tenant`] performs a complete run: normalize the dealer
//! URL, discover candidate inventory pages, run the extractor cascade per
//! candidate, enhance incomplete vehicles from their detail pages (bounded
//! fan-out), enrich via VIN decode, then hand the full parsed set to the
//! reconciliation engine and record the snapshot and structured logs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use diesel::SqliteConnection;
use once_cell::sync::Lazy;
use regex::Regex;
use site_extractor::fetch::Fetcher;
use site_extractor::html;
use site_extractor::listing_date::{self, ListingDate, ListingDateInputs};
use site_extractor::model::{is_valid_vin, ParsedVehicle};
use site_extractor::providers::{self, ExtractionOutcome, ScraperMethod};
use site_extractor::vin::VinClient;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::Settings;
use crate::models::{NewInventorySnapshotRow, NewScrapingLogRow, SnapshotStatus, Tenant};
use crate::reconcile;
use crate::repo;
use crate::timefmt::to_rfc3339_millis;

/// Free VIN decode service; only its request/response shape is relied on.
const VIN_DECODE_ENDPOINT: &str = "https://vpic.nhtsa.dot.gov/api/vehicles/DecodeVin";

/// How many candidate inventory URLs a single run will fan out to.
const MAX_CANDIDATE_URLS: usize = 5;

static INVENTORY_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(/inventory|/used-|/vehicles|/cars\b|-for-sale|/pre-owned)").unwrap()
});

/// Long-lived pipeline collaborators, shared across tenants and runs.
pub struct PipelineContext {
    pub http: reqwest::Client,
    pub fetcher: Arc<Fetcher>,
    pub settings: Settings,
}

impl PipelineContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            fetcher: Arc::new(Fetcher::new()),
            settings,
        }
    }
}

/// Outcome of one tenant's run, feeding the result envelope.
#[derive(Debug, Clone)]
pub struct TenantRunResult {
    pub tenant: String,
    pub tenant_name: String,
    pub website: Option<String>,
    pub vehicles_found: usize,
    pub new_vehicles: usize,
    pub updated_vehicles: usize,
    pub sold_vehicles: usize,
    pub status: SnapshotStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub scraper_method: Option<String>,
    pub scraper_tier: Option<String>,
    pub scraper_confidence: Option<String>,
}

impl TenantRunResult {
    fn failed(tenant: &Tenant, error: String, duration_ms: u64) -> Self {
        Self {
            tenant: tenant.id.clone(),
            tenant_name: tenant.name.clone(),
            website: tenant.website.clone(),
            vehicles_found: 0,
            new_vehicles: 0,
            updated_vehicles: 0,
            sold_vehicles: 0,
            status: SnapshotStatus::Failed,
            error: Some(error),
            duration_ms,
            scraper_method: None,
            scraper_tier: None,
            scraper_confidence: None,
        }
    }
}

/// Page context captured while enhancing a vehicle from its detail page,
/// kept for listing-date resolution.
struct DetailContext {
    json_ld_blocks: Vec<String>,
    meta_tags: Vec<(String, String)>,
    visible_text: String,
}

/// Run the full pipeline for one tenant.
pub async fn run_tenant(
    ctx: &PipelineContext,
    conn: &mut SqliteConnection,
    tenant: &Tenant,
) -> TenantRunResult {
    let span = tracing::info_span!("pipeline_run", tenant = %tenant.id);
    run_tenant_inner(ctx, conn, tenant).instrument(span).await
}

async fn run_tenant_inner(
    ctx: &PipelineContext,
    conn: &mut SqliteConnection,
    tenant: &Tenant,
) -> TenantRunResult {
    let started = Instant::now();
    let now = Utc::now();

    let Some(website) = tenant.website.as_deref() else {
        log_event(conn, &tenant.id, None, "error", "tenant has no website configured", None);
        return TenantRunResult::failed(tenant, "no website configured".to_string(), 0);
    };

    let root = match site_extractor::url::normalize(website) {
        Ok(root) => root,
        Err(e) => {
            log_event(conn, &tenant.id, None, "error", "website url failed to normalize", Some(serde_json::json!({"website": website, "error": e.to_string()})));
            return TenantRunResult::failed(tenant, e.to_string(), elapsed_ms(started));
        }
    };

    let snapshot_id = match repo::insert_snapshot(
        conn,
        &NewInventorySnapshotRow {
            tenant_id: tenant.id.clone(),
            started_at: to_rfc3339_millis(now),
            status: SnapshotStatus::Pending.as_str().to_string(),
            vehicles_found: 0,
            duration_ms: 0,
            raw_data: String::new(),
        },
    ) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!(error = %e, "snapshot insert failed, continuing without one");
            None
        }
    };

    let sitemap = match crate::sitemap_cache::get_or_fetch(
        conn,
        &ctx.fetcher,
        &tenant.id,
        &root,
        ctx.settings.sitemap_ttl(),
        now,
    )
    .await
    {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(error = %e, "sitemap cache unavailable for this run");
            Default::default()
        }
    };

    let candidates = discover_candidates(ctx, &root).await;
    if candidates.is_empty() {
        let error = "discovery yielded no candidate inventory urls".to_string();
        log_event(conn, &tenant.id, snapshot_id, "error", &error, None);
        finish(conn, snapshot_id, SnapshotStatus::Failed, 0, started, "");
        return TenantRunResult::failed(tenant, error, elapsed_ms(started));
    }

    let extractor_config = ctx.settings.extractor_config();
    let mut vehicles: Vec<ParsedVehicle> = Vec::new();
    let mut methods: HashSet<ScraperMethod> = HashSet::new();
    let mut tier: Option<String> = None;
    let mut confidence: Option<String> = None;

    for candidate in &candidates {
        match providers::extract(&ctx.http, &ctx.fetcher, &extractor_config, candidate).await {
            Ok(ExtractionOutcome { vehicles: found, method, tier: t, confidence: c, .. }) => {
                tracing::info!(url = %candidate, count = found.len(), ?method, "candidate extracted");
                methods.insert(method);
                if tier.is_none() {
                    tier = t;
                }
                if confidence.is_none() {
                    confidence = c.map(|c| confidence_str(c).to_string());
                }
                vehicles.extend(found);
            }
            Err(e) => {
                log_event(conn, &tenant.id, snapshot_id, "warn", "candidate url yielded no vehicles", Some(serde_json::json!({"url": candidate, "error": e.to_string()})));
            }
        }
    }

    if vehicles.is_empty() {
        let error = format!("no vehicles extracted from {} candidate urls", candidates.len());
        log_event(conn, &tenant.id, snapshot_id, "error", &error, None);
        finish(conn, snapshot_id, SnapshotStatus::Failed, 0, started, "");
        return TenantRunResult::failed(tenant, error, elapsed_ms(started));
    }

    let mut vehicles = dedupe(vehicles);

    let detail_contexts = enhance_from_detail_pages(ctx, conn, &tenant.id, snapshot_id, &mut vehicles).await;
    enrich_from_vin_decode(ctx, &mut vehicles).await;

    let raw_data = serde_json::to_string(&vehicles).unwrap_or_default();
    let vehicles_found = vehicles.len();

    let sitemap_entries = sitemap.entries;
    let resolve_date = |v: &ParsedVehicle| -> ListingDate {
        let context = v.listing_url.as_deref().and_then(|u| detail_contexts.get(u));
        let url_path = v
            .listing_url
            .as_deref()
            .and_then(|u| url::Url::parse(u).ok())
            .map(|u| u.path().to_string());
        // a multi-image listing must corroborate its filename date before
        // the image tier is allowed to fire
        let image_url = if v.image_urls.len() >= 2 {
            html::corroborated_image_date(&v.image_urls)
                .and(v.primary_image_url.as_deref())
        } else {
            v.primary_image_url.as_deref()
        };
        let inputs = ListingDateInputs {
            image_url,
            json_ld_blocks: context.map(|c| c.json_ld_blocks.as_slice()).unwrap_or(&[]),
            meta_tags: context.map(|c| c.meta_tags.as_slice()).unwrap_or(&[]),
            url_path: url_path.as_deref(),
            sitemap: Some(&sitemap_entries),
            visible_text: context.map(|c| c.visible_text.as_str()).unwrap_or(""),
        };
        listing_date::resolve(&inputs, now)
    };

    let counts = match reconcile::run(
        conn,
        &tenant.id,
        vehicles,
        resolve_date,
        now,
        ctx.settings.reconcile.sold_absence_days,
    ) {
        Ok(counts) => counts,
        Err(e) => {
            log_event(conn, &tenant.id, snapshot_id, "error", "reconciliation failed", Some(serde_json::json!({"error": e.to_string()})));
            finish(conn, snapshot_id, SnapshotStatus::Failed, vehicles_found as i32, started, &raw_data);
            return TenantRunResult::failed(tenant, e.to_string(), elapsed_ms(started));
        }
    };

    let status = if counts.write_failures > 0 {
        SnapshotStatus::Partial
    } else {
        SnapshotStatus::Success
    };
    finish(conn, snapshot_id, status, vehicles_found as i32, started, &raw_data);
    log_event(
        conn,
        &tenant.id,
        snapshot_id,
        "info",
        "run complete",
        Some(serde_json::json!({
            "vehicles_found": vehicles_found,
            "new": counts.new_vehicles,
            "updated": counts.updated_vehicles,
            "sold": counts.sold_vehicles,
            "write_failures": counts.write_failures,
        })),
    );

    TenantRunResult {
        tenant: tenant.id.clone(),
        tenant_name: tenant.name.clone(),
        website: Some(root),
        vehicles_found,
        new_vehicles: counts.new_vehicles,
        updated_vehicles: counts.updated_vehicles,
        sold_vehicles: counts.sold_vehicles,
        status,
        error: None,
        duration_ms: elapsed_ms(started),
        scraper_method: Some(method_str(&methods).to_string()),
        scraper_tier: tier,
        scraper_confidence: confidence,
    }
}

/// The dealer root plus on-site links that look like inventory pages,
/// capped at [`MAX_CANDIDATE_URLS`].
async fn discover_candidates(ctx: &PipelineContext, root: &str) -> Vec<String> {
    let mut candidates = vec![root.to_string()];

    let result = ctx.fetcher.fetch(root, &ctx.settings.fetch_options()).await;
    if let Some(body) = result.body {
        for href in html::anchor_hrefs(&body) {
            if !INVENTORY_LINK_RE.is_match(&href) {
                continue;
            }
            let Ok(resolved) = site_extractor::url::resolve(&href, root) else {
                continue;
            };
            // stay on the dealer's own site
            if !resolved.starts_with(root.trim_end_matches('/')) {
                continue;
            }
            if !candidates.contains(&resolved) {
                candidates.push(resolved);
            }
            if candidates.len() >= MAX_CANDIDATE_URLS {
                break;
            }
        }
    }

    candidates
}

/// A vehicle is incomplete while any critical field is still missing; those
/// are the ones worth a detail-page fetch.
fn vehicle_is_incomplete(v: &ParsedVehicle) -> bool {
    v.year.is_none()
        || v.make.is_none()
        || v.model.is_none()
        || v.price.is_none()
        || v.mileage.is_none()
        || !v.has_valid_vin()
}

/// Merge non-empty detail fields onto the listing: the detail page
/// never overwrites a field the listing already has. Returns `false` without
/// touching the listing when the detail page disagrees on year or make,
/// which is the signature of a mis-parsed card bleeding in foreign data.
pub fn merge_detail(listing: &mut ParsedVehicle, detail: &ParsedVehicle) -> bool {
    let year_conflict = listing.year.is_some() && detail.year.is_some() && listing.year != detail.year;
    let make_conflict = match (&listing.make, &detail.make) {
        (Some(a), Some(b)) => !a.eq_ignore_ascii_case(b),
        _ => false,
    };
    if year_conflict || make_conflict {
        return false;
    }

    if listing.vin.is_none() {
        listing.vin = detail.vin.clone();
    }
    if listing.stock_number.is_none() {
        listing.stock_number = detail.stock_number.clone();
    }
    if listing.year.is_none() {
        listing.year = detail.year;
    }
    if listing.make.is_none() {
        listing.make = detail.make.clone();
    }
    if listing.model.is_none() {
        listing.model = detail.model.clone();
    }
    if listing.trim.is_none() {
        listing.trim = detail.trim.clone();
    }
    if listing.color.is_none() {
        listing.color = detail.color.clone();
    }
    if listing.mileage.is_none() {
        listing.mileage = detail.mileage;
    }
    if listing.price.is_none() {
        listing.price = detail.price;
    }
    if listing.primary_image_url.is_none() {
        listing.primary_image_url = detail.primary_image_url.clone();
    }
    if listing.image_date.is_none() {
        listing.image_date = detail.image_date;
    }
    true
}

/// Fetch detail pages for incomplete vehicles with at most
/// `detail.concurrency` outstanding requests, merge what they yield, and
/// keep each page's date-bearing context for the listing-date resolver.
async fn enhance_from_detail_pages(
    ctx: &PipelineContext,
    conn: &mut SqliteConnection,
    tenant: &str,
    snapshot_id: Option<i32>,
    vehicles: &mut [ParsedVehicle],
) -> HashMap<String, DetailContext> {
    let semaphore = Arc::new(Semaphore::new(ctx.settings.detail.concurrency.max(1)));
    let mut join_set: JoinSet<(usize, String, Option<(Option<ParsedVehicle>, DetailContext)>)> =
        JoinSet::new();

    for (idx, vehicle) in vehicles.iter().enumerate() {
        if !vehicle_is_incomplete(vehicle) {
            continue;
        }
        let Some(url) = vehicle.listing_url.clone() else {
            continue;
        };
        let fetcher = ctx.fetcher.clone();
        let opts = ctx.settings.fetch_options();
        let semaphore = semaphore.clone();
        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (idx, url, None);
            };
            let result = fetcher.fetch(&url, &opts).await;
            let Some(body) = result.body else {
                return (idx, url, None);
            };
            let detail = html::parse(&body, &url).into_iter().next();
            let context = DetailContext {
                json_ld_blocks: html::jsonld::json_ld_blocks(&body),
                meta_tags: html::meta_tags(&body),
                visible_text: html::visible_text(&body),
            };
            (idx, url, Some((detail, context)))
        });
    }

    let mut contexts = HashMap::new();
    while let Some(joined) = join_set.join_next().await {
        let Ok((idx, url, payload)) = joined else {
            continue;
        };
        let Some((detail, context)) = payload else {
            // timeout or fetch failure is not fatal; the vehicle keeps its
            // listing-page data
            continue;
        };

        let accepted = match detail {
            Some(detail) => {
                if merge_detail(&mut vehicles[idx], &detail) {
                    true
                } else {
                    log_event(
                        conn,
                        tenant,
                        snapshot_id,
                        "warn",
                        "detail page mismatch, keeping listing-page data",
                        Some(serde_json::json!({
                            "url": url,
                            "listing_year": vehicles[idx].year,
                            "listing_make": vehicles[idx].make,
                            "detail_year": detail.year,
                            "detail_make": detail.make,
                        })),
                    );
                    false
                }
            }
            None => false,
        };

        if accepted {
            contexts.insert(url, context);
        }
    }

    contexts
}

/// Final enhancement step: decode still-incomplete vehicles that carry a
/// real VIN and fill only their missing fields.
async fn enrich_from_vin_decode(ctx: &PipelineContext, vehicles: &mut [ParsedVehicle]) {
    let client = VinClient::new(ctx.http.clone(), VIN_DECODE_ENDPOINT.to_string());
    for vehicle in vehicles.iter_mut() {
        if !vehicle_is_incomplete(vehicle) {
            continue;
        }
        let Some(vin) = vehicle.vin.clone() else {
            continue;
        };
        if !is_valid_vin(&vin) {
            continue;
        }
        if let Some(decoded) = client.decode(&vin).await {
            site_extractor::vin::enrich(vehicle, &decoded);
        }
    }
}

/// Drop exact re-sightings of one listing across candidate pages, keeping
/// first-seen order.
fn dedupe(vehicles: Vec<ParsedVehicle>) -> Vec<ParsedVehicle> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in vehicles {
        let key = dedupe_key(&v);
        if seen.insert(key) {
            out.push(v);
        }
    }
    out
}

fn dedupe_key(v: &ParsedVehicle) -> String {
    if let Some(vin) = v.vin.as_deref().filter(|vin| is_valid_vin(vin)) {
        return format!("vin:{vin}");
    }
    if let Some(stock) = &v.stock_number {
        return format!("stock:{stock}");
    }
    if let Some(url) = &v.listing_url {
        return format!("url:{url}");
    }
    format!(
        "attrs:{:?}:{:?}:{:?}:{:?}:{:?}",
        v.year, v.make, v.model, v.price, v.mileage
    )
}

fn method_str(methods: &HashSet<ScraperMethod>) -> &'static str {
    if methods.len() > 1 {
        return "mixed";
    }
    match methods.iter().next() {
        Some(ScraperMethod::Primary) => "primary",
        Some(ScraperMethod::Secondary) => "secondary",
        Some(ScraperMethod::HtmlParser) | None => "html_parser",
    }
}

fn confidence_str(c: site_extractor::providers::remote::Confidence) -> &'static str {
    use site_extractor::providers::remote::Confidence;
    match c {
        Confidence::High => "high",
        Confidence::Medium => "medium",
        Confidence::Low => "low",
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn finish(
    conn: &mut SqliteConnection,
    snapshot_id: Option<i32>,
    status: SnapshotStatus,
    vehicles_found: i32,
    started: Instant,
    raw_data: &str,
) {
    let Some(id) = snapshot_id else {
        return;
    };
    if let Err(e) = repo::finish_snapshot(
        conn,
        id,
        status.as_str(),
        vehicles_found,
        elapsed_ms(started) as i64,
        raw_data,
    ) {
        tracing::error!(error = %e, "snapshot finish failed");
    }
}

/// Write one structured log row; a failed log write is itself only traced,
/// never allowed to fail the run.
fn log_event(
    conn: &mut SqliteConnection,
    tenant: &str,
    snapshot_id: Option<i32>,
    level: &str,
    message: &str,
    detail: Option<serde_json::Value>,
) {
    match level {
        "error" => tracing::error!(tenant, message, ?detail),
        "warn" => tracing::warn!(tenant, message, ?detail),
        _ => tracing::info!(tenant, message, ?detail),
    }

    let row = NewScrapingLogRow {
        tenant_id: tenant.to_string(),
        snapshot_id,
        level: level.to_string(),
        message: message.to_string(),
        detail: detail.map(|d| d.to_string()),
        logged_at: to_rfc3339_millis(Utc::now()),
    };
    if let Err(e) = repo::insert_log(conn, &row) {
        tracing::error!(error = %e, "scraping log write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> ParsedVehicle {
        ParsedVehicle {
            year: Some(2020),
            make: Some("Honda".to_string()),
            model: Some("Accord".to_string()),
            price: Some(23_495),
            ..Default::default()
        }
    }

    #[test]
    fn merge_fills_only_missing_fields() {
        let mut l = listing();
        let detail = ParsedVehicle {
            year: Some(2020),
            make: Some("Honda".to_string()),
            model: Some("Civic".to_string()),
            mileage: Some(42_000),
            vin: Some("1HGCV1F30LA012345".to_string()),
            ..Default::default()
        };
        assert!(merge_detail(&mut l, &detail));
        assert_eq!(l.model.as_deref(), Some("Accord"));
        assert_eq!(l.mileage, Some(42_000));
        assert_eq!(l.vin.as_deref(), Some("1HGCV1F30LA012345"));
    }

    #[test]
    fn merge_rejects_year_make_mismatch() {
        let mut l = listing();
        let original = l.clone();
        let detail = ParsedVehicle {
            year: Some(2019),
            make: Some("Honda".to_string()),
            model: Some("Civic".to_string()),
            ..Default::default()
        };
        assert!(!merge_detail(&mut l, &detail));
        assert_eq!(l, original);
    }

    #[test]
    fn merge_accepts_when_listing_lacks_year_and_make() {
        let mut l = ParsedVehicle {
            listing_url: Some("https://dealer.test/vehicle/9".to_string()),
            ..Default::default()
        };
        let detail = ParsedVehicle {
            year: Some(2021),
            make: Some("Ford".to_string()),
            model: Some("F-150".to_string()),
            ..Default::default()
        };
        assert!(merge_detail(&mut l, &detail));
        assert_eq!(l.year, Some(2021));
    }

    #[test]
    fn dedupe_prefers_vin_then_stock_then_url() {
        let a = ParsedVehicle {
            vin: Some("1HGCV1F30LA012345".to_string()),
            price: Some(23_495),
            ..Default::default()
        };
        let b = ParsedVehicle {
            vin: Some("1HGCV1F30LA012345".to_string()),
            price: Some(22_995),
            ..Default::default()
        };
        let out = dedupe(vec![a.clone(), b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].price, Some(23_495));
    }

    #[test]
    fn incomplete_when_any_critical_field_missing() {
        let mut v = ParsedVehicle {
            vin: Some("1HGCV1F30LA012345".to_string()),
            year: Some(2020),
            make: Some("Honda".to_string()),
            model: Some("Accord".to_string()),
            price: Some(23_495),
            mileage: Some(42_000),
            ..Default::default()
        };
        assert!(!vehicle_is_incomplete(&v));
        v.mileage = None;
        assert!(vehicle_is_incomplete(&v));
    }

    #[test]
    fn method_label_collapses_to_mixed() {
        let mut methods = HashSet::new();
        methods.insert(ScraperMethod::Primary);
        assert_eq!(method_str(&methods), "primary");
        methods.insert(ScraperMethod::HtmlParser);
        assert_eq!(method_str(&methods), "mixed");
    }
}
