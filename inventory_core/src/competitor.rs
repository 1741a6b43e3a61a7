//! Competitor aggregation: the same fetch+parse front half as the
//! inventory pipeline, then statistics instead of reconciliation.

use chrono::Utc;
use diesel::SqliteConnection;
use indexmap::IndexMap;
use serde::Serialize;
use site_extractor::model::ParsedVehicle;
use site_extractor::providers;

use crate::models::{MakeCount, NewCompetitorScanHistoryRow, NewCompetitorSnapshotRow};
use crate::pipeline::PipelineContext;
use crate::repo;
use crate::timefmt::to_rfc3339_millis;

/// Aggregate statistics over one competitor scan, also the response
/// body for the competitor endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetitorStats {
    pub competitor_url: String,
    pub count: usize,
    pub avg_price: Option<f64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub avg_mileage: Option<f64>,
    pub min_mileage: Option<i64>,
    pub max_mileage: Option<i64>,
    pub total_inventory_value: i64,
    pub top_makes: Vec<MakeCount>,
}

/// Compute stats over the full parsed set. No sampling: every vehicle with a
/// known price participates in the price stats, and likewise for mileage.
pub fn aggregate(competitor_url: &str, vehicles: &[ParsedVehicle]) -> CompetitorStats {
    let prices: Vec<i64> = vehicles.iter().filter_map(|v| v.price).collect();
    let mileages: Vec<i64> = vehicles.iter().filter_map(|v| v.mileage).collect();

    let mut make_counts: IndexMap<String, i64> = IndexMap::new();
    for make in vehicles.iter().filter_map(|v| v.make.as_deref()) {
        *make_counts.entry(make.to_string()).or_insert(0) += 1;
    }
    // stable sort keeps first-seen order among equal counts
    make_counts.sort_by(|_, a, _, b| b.cmp(a));
    let top_makes = make_counts
        .into_iter()
        .take(5)
        .map(|(make, count)| MakeCount { make, count })
        .collect();

    CompetitorStats {
        competitor_url: competitor_url.to_string(),
        count: vehicles.len(),
        avg_price: mean(&prices),
        min_price: prices.iter().min().copied(),
        max_price: prices.iter().max().copied(),
        avg_mileage: mean(&mileages),
        min_mileage: mileages.iter().min().copied(),
        max_mileage: mileages.iter().max().copied(),
        total_inventory_value: prices.iter().sum(),
        top_makes,
    }
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
}

/// Scan one competitor URL for the calling tenant: extract, aggregate, then
/// upsert the snapshot and append a history row. The two writes run in
/// sequence and a failure of one is logged without aborting the other.
pub async fn scan(
    ctx: &PipelineContext,
    conn: &mut SqliteConnection,
    tenant: &str,
    competitor_url: &str,
) -> anyhow::Result<CompetitorStats> {
    let extractor_config = ctx.settings.extractor_config();
    let outcome =
        providers::extract(&ctx.http, &ctx.fetcher, &extractor_config, competitor_url).await?;

    let stats = aggregate(competitor_url, &outcome.vehicles);
    persist(conn, tenant, &stats);
    Ok(stats)
}

/// Write the snapshot upsert and the history append for an already-computed
/// scan.
pub fn persist(conn: &mut SqliteConnection, tenant: &str, stats: &CompetitorStats) {
    let scanned_at = to_rfc3339_millis(Utc::now());
    let top_makes = serde_json::to_string(&stats.top_makes).unwrap_or_else(|_| "[]".to_string());

    let snapshot = NewCompetitorSnapshotRow {
        tenant_id: tenant.to_string(),
        competitor_url: stats.competitor_url.clone(),
        count: stats.count as i32,
        avg_price: stats.avg_price,
        min_price: stats.min_price,
        max_price: stats.max_price,
        avg_mileage: stats.avg_mileage,
        min_mileage: stats.min_mileage,
        max_mileage: stats.max_mileage,
        total_inventory_value: stats.total_inventory_value,
        top_makes: top_makes.clone(),
        scanned_at: scanned_at.clone(),
    };
    if let Err(e) = repo::upsert_competitor_snapshot(conn, &snapshot) {
        tracing::error!(tenant, url = %stats.competitor_url, error = %e, "competitor snapshot upsert failed");
    }

    let history = NewCompetitorScanHistoryRow {
        tenant_id: tenant.to_string(),
        competitor_url: stats.competitor_url.clone(),
        count: stats.count as i32,
        avg_price: stats.avg_price,
        min_price: stats.min_price,
        max_price: stats.max_price,
        avg_mileage: stats.avg_mileage,
        min_mileage: stats.min_mileage,
        max_mileage: stats.max_mileage,
        total_inventory_value: stats.total_inventory_value,
        top_makes,
        scanned_at,
    };
    if let Err(e) = repo::insert_competitor_history(conn, &history) {
        tracing::error!(tenant, url = %stats.competitor_url, error = %e, "competitor history append failed");
    }
}
