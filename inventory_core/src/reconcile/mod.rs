//! Reconciliation engine.
//!
//! ## What this does
//! - Builds the **wanted** state from the run's parsed vehicles, assigning each
//!   its stable identifier in insertion order.
//! - Computes a **diff** against the tenant's current active history: inserts
//!   for first sightings, in-place updates (with price-history appends and
//!   identifier upgrades) for matches, and sold transitions for rows absent
//!   past the grace window.
//! - Applies the diff write-by-write. There is no outer transaction on
//!   purpose: a failed write on one vehicle must not roll back its neighbors,
//!   only mark the run `partial`. The one grouping that is transactional is a
//!   sold transition, where the status flip and its sales record commit
//!   together under `BEGIN IMMEDIATE`.
//!
//! ## Ordering
//! The parsed set is processed in insertion order; identifier-collision
//! tie-breaks go to the earlier element.

mod apply;
pub mod diff;
pub mod want;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use site_extractor::listing_date::ListingDate;
use site_extractor::model::ParsedVehicle;

pub use apply::ApplyStats;
pub use diff::{ReconcileDiff, SoldTransition};
pub use want::WantedVehicle;

use crate::repo::{self, RepoResult};

/// Counts reported back into the snapshot and the result envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCounts {
    pub new_vehicles: usize,
    pub updated_vehicles: usize,
    pub sold_vehicles: usize,
    pub write_failures: usize,
}

/// Run the full engine for one tenant: read current, diff the parsed set
/// against it, and persist the result.
///
/// `resolve_date` is consulted per wanted vehicle; only first sightings
/// persist its result. The caller decides what page context (detail HTML,
/// sitemap, image filename) backs the resolution.
pub fn run(
    conn: &mut SqliteConnection,
    tenant: &str,
    parsed: Vec<ParsedVehicle>,
    resolve_date: impl Fn(&ParsedVehicle) -> ListingDate,
    now: DateTime<Utc>,
    sold_absence_days: i64,
) -> RepoResult<RunCounts> {
    let current = repo::list_active(conn, tenant)?;
    let wanted = want::wanted_from_parsed(parsed);

    let listing_dates: HashMap<String, ListingDate> = wanted
        .iter()
        .map(|w| (w.identifier.clone(), resolve_date(&w.vehicle)))
        .collect();

    let diff = diff::make_diff(tenant, wanted, current, now, sold_absence_days, &listing_dates);
    let stats = apply::apply_diff(conn, &diff);

    Ok(RunCounts {
        new_vehicles: stats.inserted,
        updated_vehicles: stats.updated,
        sold_vehicles: stats.sold,
        write_failures: stats.failures,
    })
}
