//! Scheduler/dispatcher: the two pipeline entrypoints.
//!
//! The on-demand entrypoint runs exactly one tenant with no budget beyond
//! the fetcher's own timeouts. The periodic entrypoint walks every eligible
//! tenant sequentially under a wall-clock budget; tenants that do not fit
//! are deferred to the next invocation, and the in-flight tenant is never
//! interrupted. The once-a-day trigger lives outside this process.

use std::time::Instant;

use diesel::SqliteConnection;
use serde::Serialize;

use crate::models::SnapshotStatus;
use crate::pipeline::{self, PipelineContext, TenantRunResult};
use crate::repo;

/// One tenant entry in the response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct TenantResult {
    pub tenant: String,
    pub tenant_name: String,
    pub website: Option<String>,
    pub vehicles_found: usize,
    pub new_vehicles: usize,
    pub updated_vehicles: usize,
    pub sold_vehicles: usize,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraper_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraper_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraper_confidence: Option<String>,
}

impl From<TenantRunResult> for TenantResult {
    fn from(r: TenantRunResult) -> Self {
        Self {
            tenant: r.tenant,
            tenant_name: r.tenant_name,
            website: r.website,
            vehicles_found: r.vehicles_found,
            new_vehicles: r.new_vehicles,
            updated_vehicles: r.updated_vehicles,
            sold_vehicles: r.sold_vehicles,
            status: r.status.as_str().to_string(),
            error: r.error,
            duration_ms: r.duration_ms,
            scraper_method: r.scraper_method,
            scraper_tier: r.scraper_tier,
            scraper_confidence: r.scraper_confidence,
        }
    }
}

/// Roll-up over one dispatch invocation.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub total_tenants: usize,
    pub requested_tenants: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_vehicles: usize,
    pub duration_ms: u64,
    pub timed_out: bool,
}

/// The full inventory-pipeline response.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<TenantResult>,
    pub summary: DispatchSummary,
}

/// On-demand entrypoint: run the pipeline for exactly one tenant.
pub async fn run_single(
    ctx: &PipelineContext,
    conn: &mut SqliteConnection,
    tenant_id: &str,
) -> anyhow::Result<DispatchResponse> {
    let started = Instant::now();
    let tenant = repo::get_tenant(conn, tenant_id)?;

    let result = pipeline::run_tenant(ctx, conn, &tenant).await;
    Ok(summarize(vec![result], 1, false, started))
}

/// Periodic entrypoint: run every eligible tenant in sequence until the
/// wall-clock budget is spent.
pub async fn run_all(
    ctx: &PipelineContext,
    conn: &mut SqliteConnection,
) -> anyhow::Result<DispatchResponse> {
    let started = Instant::now();
    let budget = ctx.settings.wall_clock_budget();
    let tenants = repo::list_eligible_tenants(conn)?;
    let requested = tenants.len();

    let mut results = Vec::new();
    let mut timed_out = false;
    for tenant in tenants {
        if started.elapsed() >= budget {
            tracing::warn!(
                completed = results.len(),
                requested,
                "wall-clock budget reached, deferring remaining tenants"
            );
            timed_out = true;
            break;
        }
        results.push(pipeline::run_tenant(ctx, conn, &tenant).await);
    }

    Ok(summarize(results, requested, timed_out, started))
}

fn summarize(
    results: Vec<TenantRunResult>,
    requested: usize,
    timed_out: bool,
    started: Instant,
) -> DispatchResponse {
    let successful = results
        .iter()
        .filter(|r| r.status != SnapshotStatus::Failed)
        .count();
    let failed = results.len() - successful;
    let total_vehicles = results.iter().map(|r| r.vehicles_found).sum();

    let summary = DispatchSummary {
        total_tenants: results.len(),
        requested_tenants: requested,
        successful,
        failed,
        total_vehicles,
        duration_ms: started.elapsed().as_millis() as u64,
        timed_out,
    };

    let message = if timed_out {
        format!(
            "processed {} of {} tenants before the budget expired",
            summary.total_tenants, summary.requested_tenants
        )
    } else {
        format!("processed {} tenants", summary.total_tenants)
    };

    DispatchResponse {
        success: failed == 0,
        message,
        results: results.into_iter().map(TenantResult::from).collect(),
        summary,
    }
}
