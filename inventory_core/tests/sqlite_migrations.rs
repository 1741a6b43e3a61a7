//! Embedded migrations produce the expected tables and constraints.

mod common;

use diesel::prelude::*;
use diesel::sql_query;
use inventory_core::models::NewSalesRecordRow;
use inventory_core::repo;

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}

#[test]
fn all_core_tables_exist() {
    let (_db, mut conn) = common::setup_db();

    let rows: Vec<TableName> =
        sql_query("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .load(&mut conn)
            .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();

    for expected in [
        "tenants",
        "vehicle_history",
        "sales_records",
        "inventory_snapshots",
        "scraping_logs",
        "sitemap_cache",
        "competitor_snapshots",
        "competitor_scan_history",
    ] {
        assert!(names.contains(&expected), "missing table {expected}");
    }
}

#[test]
fn sales_record_unique_constraint_deduplicates() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, "t1", Some("https://example-dealer.test"));

    let record = NewSalesRecordRow {
        tenant_id: "t1".to_string(),
        identifier: "STOCK_ABC123".to_string(),
        year: Some(2019),
        make: Some("Toyota".to_string()),
        model: Some("Camry".to_string()),
        sale_price: Some(21_000),
        sale_date: "2026-07-05".to_string(),
        days_to_sale: 4,
        acquisition_cost: None,
        gross_profit: None,
        margin_percent: None,
    };

    repo::insert_sales_record(&mut conn, &record).unwrap();
    repo::insert_sales_record(&mut conn, &record).unwrap();

    assert_eq!(common::count(&mut conn, "sales_records"), 1);
}

#[test]
fn snapshot_roundtrip_records_final_status_and_raw_data() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, "t1", Some("https://example-dealer.test"));

    let id = repo::insert_snapshot(
        &mut conn,
        &inventory_core::models::NewInventorySnapshotRow {
            tenant_id: "t1".to_string(),
            started_at: "2026-07-01T12:00:00.000Z".to_string(),
            status: "pending".to_string(),
            vehicles_found: 0,
            duration_ms: 0,
            raw_data: String::new(),
        },
    )
    .unwrap();

    repo::finish_snapshot(&mut conn, id, "success", 3, 1_234, "[{\"vin\":null}]").unwrap();

    let row = repo::get_snapshot(&mut conn, id).unwrap().unwrap();
    assert_eq!(row.status, "success");
    assert_eq!(row.vehicles_found, 3);
    assert_eq!(row.duration_ms, 1_234);
    assert!(!row.raw_data.is_empty());
}

#[test]
fn eligible_tenant_listing_skips_suspended_and_site_less() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, "active-with-site", Some("https://a.test"));
    common::seed_tenant(&mut conn, "active-no-site", None);

    diesel::sql_query(
        "INSERT INTO tenants (id, name, website, status, subscription_tier, cost_settings, created_at) \
         VALUES ('suspended', 'Suspended Motors', 'https://b.test', 'suspended', 'starter', '{}', '2026-01-01T00:00:00.000Z')",
    )
    .execute(&mut conn)
    .unwrap();

    let eligible = repo::list_eligible_tenants(&mut conn).unwrap();
    let ids: Vec<&str> = eligible.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["active-with-site"]);
}
