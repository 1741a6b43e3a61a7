//! Typed persistence functions, one per entity operation.
//!
//! Every function takes `&mut SqliteConnection` plus a `tenant` (or a row
//! that already carries one) and scopes its query accordingly. No function
//! here spans more than one table's writes — composing several into one
//! transaction is the caller's job (see `reconcile::apply`).

use diesel::prelude::*;

use crate::models::{
    InventorySnapshotRow, NewCompetitorScanHistoryRow, NewCompetitorSnapshotRow,
    NewInventorySnapshotRow, NewSalesRecordRow, NewScrapingLogRow, NewSitemapCacheRow,
    NewVehicleHistoryRow, SalesRecordRow, SitemapCacheRow, Tenant, VehicleHistoryRow,
    VehicleStatus,
};
use crate::schema::{
    competitor_scan_history, competitor_snapshots, inventory_snapshots, scraping_logs,
    sitemap_cache, tenants, vehicle_history,
};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("tenant not found: {0}")]
    TenantNotFound(String),
    #[error(transparent)]
    Db(#[from] diesel::result::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

pub fn get_tenant(conn: &mut SqliteConnection, tenant: &str) -> RepoResult<Tenant> {
    tenants::table
        .find(tenant)
        .select(Tenant::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| RepoError::TenantNotFound(tenant.to_string()))
}

/// Tenants eligible for the periodic all-tenants run: not
/// suspended/cancelled and carrying a website to scrape. The status check is
/// an exclusion, so a status this code predates stays eligible.
pub fn list_eligible_tenants(conn: &mut SqliteConnection) -> RepoResult<Vec<Tenant>> {
    let rows = tenants::table
        .filter(tenants::website.is_not_null())
        .select(Tenant::as_select())
        .load(conn)?;
    Ok(rows
        .into_iter()
        .filter(Tenant::is_eligible_for_periodic_run)
        .collect())
}

pub fn get_active_by_identifier(
    conn: &mut SqliteConnection,
    tenant: &str,
    identifier: &str,
) -> RepoResult<Option<VehicleHistoryRow>> {
    let row = vehicle_history::table
        .filter(vehicle_history::tenant_id.eq(tenant))
        .filter(vehicle_history::identifier.eq(identifier))
        .filter(vehicle_history::status.eq(VehicleStatus::Active.as_str()))
        .select(VehicleHistoryRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

/// All active rows for a tenant, used by the reconciliation engine to
/// compute the disappearance sweep against the current run's identifier set.
pub fn list_active(conn: &mut SqliteConnection, tenant: &str) -> RepoResult<Vec<VehicleHistoryRow>> {
    let rows = vehicle_history::table
        .filter(vehicle_history::tenant_id.eq(tenant))
        .filter(vehicle_history::status.eq(VehicleStatus::Active.as_str()))
        .select(VehicleHistoryRow::as_select())
        .load(conn)?;
    Ok(rows)
}

/// Insert-path write: brand-new active row.
pub fn upsert_vehicle_active(
    conn: &mut SqliteConnection,
    row: &NewVehicleHistoryRow,
) -> RepoResult<i32> {
    let id: i32 = diesel::insert_into(vehicle_history::table)
        .values(row)
        .returning(vehicle_history::id.assume_not_null())
        .get_result(conn)?;
    Ok(id)
}

/// Update-path write: overwrite an existing active row
/// in place (caller has already merged attributes and appended price
/// history before calling this).
pub fn replace_vehicle_row(conn: &mut SqliteConnection, row: &VehicleHistoryRow) -> RepoResult<()> {
    let id = row.id.expect("row must already exist to be replaced");
    diesel::update(vehicle_history::table.filter(vehicle_history::id.eq(id)))
        .set(row)
        .execute(conn)?;
    Ok(())
}

/// Disappearance-sweep transition: flips one active row to `sold`.
pub fn mark_sold(conn: &mut SqliteConnection, id: i32) -> RepoResult<()> {
    diesel::update(vehicle_history::table.filter(vehicle_history::id.eq(id)))
        .set(vehicle_history::status.eq(VehicleStatus::Sold.as_str()))
        .execute(conn)?;
    Ok(())
}

pub fn insert_sales_record(
    conn: &mut SqliteConnection,
    row: &NewSalesRecordRow,
) -> RepoResult<()> {
    diesel::insert_or_ignore_into(crate::schema::sales_records::table)
        .values(row)
        .execute(conn)?;
    Ok(())
}

pub fn list_sales_records(
    conn: &mut SqliteConnection,
    tenant: &str,
) -> RepoResult<Vec<SalesRecordRow>> {
    let rows = crate::schema::sales_records::table
        .filter(crate::schema::sales_records::tenant_id.eq(tenant))
        .select(SalesRecordRow::as_select())
        .load(conn)?;
    Ok(rows)
}

pub fn insert_snapshot(
    conn: &mut SqliteConnection,
    row: &NewInventorySnapshotRow,
) -> RepoResult<i32> {
    let id: i32 = diesel::insert_into(inventory_snapshots::table)
        .values(row)
        .returning(inventory_snapshots::id.assume_not_null())
        .get_result(conn)?;
    Ok(id)
}

/// Close out a run's snapshot with its final status, counts, and the
/// enhanced parsed set as the raw-data blob.
pub fn finish_snapshot(
    conn: &mut SqliteConnection,
    id: i32,
    status: &str,
    vehicles_found: i32,
    duration_ms: i64,
    raw_data: &str,
) -> RepoResult<()> {
    diesel::update(inventory_snapshots::table.filter(inventory_snapshots::id.eq(id)))
        .set((
            inventory_snapshots::status.eq(status),
            inventory_snapshots::vehicles_found.eq(vehicles_found),
            inventory_snapshots::duration_ms.eq(duration_ms),
            inventory_snapshots::raw_data.eq(raw_data),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn get_snapshot(
    conn: &mut SqliteConnection,
    id: i32,
) -> RepoResult<Option<InventorySnapshotRow>> {
    let row = inventory_snapshots::table
        .filter(inventory_snapshots::id.eq(id))
        .select(InventorySnapshotRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

pub fn insert_log(conn: &mut SqliteConnection, row: &NewScrapingLogRow) -> RepoResult<()> {
    diesel::insert_into(scraping_logs::table)
        .values(row)
        .execute(conn)?;
    Ok(())
}

pub fn get_sitemap_cache(
    conn: &mut SqliteConnection,
    tenant: &str,
) -> RepoResult<Option<SitemapCacheRow>> {
    let row = sitemap_cache::table
        .find(tenant)
        .select(SitemapCacheRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

pub fn upsert_sitemap_cache(
    conn: &mut SqliteConnection,
    row: &NewSitemapCacheRow,
) -> RepoResult<()> {
    diesel::insert_into(sitemap_cache::table)
        .values(row)
        .on_conflict(sitemap_cache::tenant_id)
        .do_update()
        .set(row)
        .execute(conn)?;
    Ok(())
}

pub fn upsert_competitor_snapshot(
    conn: &mut SqliteConnection,
    row: &NewCompetitorSnapshotRow,
) -> RepoResult<()> {
    diesel::insert_into(competitor_snapshots::table)
        .values(row)
        .on_conflict((
            competitor_snapshots::tenant_id,
            competitor_snapshots::competitor_url,
        ))
        .do_update()
        .set(row)
        .execute(conn)?;
    Ok(())
}

pub fn insert_competitor_history(
    conn: &mut SqliteConnection,
    row: &NewCompetitorScanHistoryRow,
) -> RepoResult<()> {
    diesel::insert_into(competitor_scan_history::table)
        .values(row)
        .execute(conn)?;
    Ok(())
}
