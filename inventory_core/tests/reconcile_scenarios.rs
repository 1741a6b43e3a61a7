//! End-to-end reconciliation scenarios over a real SQLite database: fresh
//! dealer, price change, sale detection, identifier upgrade, and the
//! idempotence law for unchanged input.

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use diesel::prelude::*;
use inventory_core::models::VehicleHistoryRow;
use inventory_core::reconcile::{self, RunCounts};
use inventory_core::repo;
use inventory_core::schema::vehicle_history;
use site_extractor::listing_date::{Confidence, ListingDate, Source};
use site_extractor::model::ParsedVehicle;

const TENANT: &str = "t1";

fn honda(price: i64) -> ParsedVehicle {
    ParsedVehicle {
        vin: Some("1HGCV1F30LA012345".to_string()),
        year: Some(2020),
        make: Some("Honda".to_string()),
        model: Some("Accord".to_string()),
        price: Some(price),
        mileage: Some(42_000),
        ..Default::default()
    }
}

fn toyota() -> ParsedVehicle {
    ParsedVehicle {
        stock_number: Some("ABC123".to_string()),
        year: Some(2019),
        make: Some("Toyota".to_string()),
        model: Some("Camry".to_string()),
        price: Some(21_000),
        mileage: Some(51_000),
        ..Default::default()
    }
}

fn ford(vin: Option<&str>) -> ParsedVehicle {
    ParsedVehicle {
        vin: vin.map(|s| s.to_string()),
        year: Some(2021),
        make: Some("Ford".to_string()),
        model: Some("F-150".to_string()),
        price: Some(37_000),
        mileage: Some(28_000),
        listing_url: Some("https://example-dealer.test/f150-4wd".to_string()),
        ..Default::default()
    }
}

fn run_at(
    conn: &mut SqliteConnection,
    parsed: Vec<ParsedVehicle>,
    now: DateTime<Utc>,
) -> RunCounts {
    let resolve = |_: &ParsedVehicle| ListingDate {
        date: now,
        confidence: Confidence::Estimated,
        source: Source::FirstScan,
    };
    reconcile::run(conn, TENANT, parsed, resolve, now, 2).expect("reconcile run")
}

fn t(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, day, hour, 0, 0).unwrap()
}

fn all_rows(conn: &mut SqliteConnection, identifier: &str) -> Vec<VehicleHistoryRow> {
    vehicle_history::table
        .filter(vehicle_history::tenant_id.eq(TENANT))
        .filter(vehicle_history::identifier.eq(identifier))
        .select(VehicleHistoryRow::as_select())
        .load(conn)
        .unwrap()
}

#[test]
fn fresh_dealer_inserts_three_active_rows() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    let counts = run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 12));
    assert_eq!(counts.new_vehicles, 3);
    assert_eq!(counts.updated_vehicles, 0);
    assert_eq!(counts.sold_vehicles, 0);

    for id in ["1HGCV1F30LA012345", "STOCK_ABC123", "2021_FORD_F-150__28000__37000"] {
        let row = repo::get_active_by_identifier(&mut conn, TENANT, id)
            .unwrap()
            .unwrap_or_else(|| panic!("missing active row for {id}"));
        assert_eq!(row.status, "active");
        assert_eq!(row.listing_date_source, "first_scan");
        assert_eq!(row.listing_date_confidence, "estimated");
    }
}

#[test]
fn price_change_appends_history_and_stays_active() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 12));
    let counts = run_at(&mut conn, vec![honda(22_995), toyota(), ford(None)], t(2, 12));

    assert_eq!(counts.new_vehicles, 0);
    assert_eq!(counts.updated_vehicles, 3);
    assert_eq!(counts.sold_vehicles, 0);

    let row = repo::get_active_by_identifier(&mut conn, TENANT, "1HGCV1F30LA012345")
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "active");
    assert_eq!(row.price, Some(22_995));
    let history = row.price_history_parsed();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].price, 23_495);
    assert_eq!(history[1].price, 22_995);
    assert!(history[0].observed_at < history[1].observed_at);
}

#[test]
fn rerun_on_unchanged_input_is_idempotent() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 12));
    let counts = run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 13));

    assert_eq!(counts.new_vehicles, 0);
    assert_eq!(counts.updated_vehicles, 3);
    assert_eq!(counts.sold_vehicles, 0);
    assert_eq!(common::count(&mut conn, "vehicle_history"), 3);

    let row = repo::get_active_by_identifier(&mut conn, TENANT, "1HGCV1F30LA012345")
        .unwrap()
        .unwrap();
    assert_eq!(row.price_history_parsed().len(), 1);
}

#[test]
fn disappeared_vehicle_becomes_sold_with_sales_record() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 12));
    run_at(&mut conn, vec![honda(22_995), toyota(), ford(None)], t(2, 12));
    let counts = run_at(&mut conn, vec![honda(22_995), ford(None)], t(5, 12));

    assert_eq!(counts.sold_vehicles, 1);
    assert_eq!(counts.updated_vehicles, 2);
    assert_eq!(counts.new_vehicles, 0);

    let rows = all_rows(&mut conn, "STOCK_ABC123");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "sold");

    let records = repo::list_sales_records(&mut conn, TENANT).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.identifier, "STOCK_ABC123");
    assert_eq!(record.sale_price, Some(21_000));
    assert_eq!(record.days_to_sale, 4);
    assert_eq!(record.sale_date, "2026-07-05");
    assert_eq!(record.acquisition_cost, None);
    assert_eq!(record.gross_profit, None);
    assert_eq!(record.margin_percent, None);
}

#[test]
fn same_day_sweep_does_not_duplicate_sales_records() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 12));
    run_at(&mut conn, vec![honda(23_495), ford(None)], t(5, 12));
    run_at(&mut conn, vec![honda(23_495), ford(None)], t(5, 14));

    assert_eq!(common::count(&mut conn, "sales_records"), 1);
}

#[test]
fn synthetic_identifier_upgrades_to_vin_in_place() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 12));
    let counts = run_at(
        &mut conn,
        vec![honda(23_495), toyota(), ford(Some("1FTFW1E50MKE12345"))],
        t(2, 12),
    );

    assert_eq!(counts.new_vehicles, 0);
    assert_eq!(counts.updated_vehicles, 3);

    assert!(all_rows(&mut conn, "2021_FORD_F-150__28000__37000").is_empty());
    let rows = all_rows(&mut conn, "1FTFW1E50MKE12345");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "active");
    assert_eq!(common::count(&mut conn, "vehicle_history"), 3);
}

#[test]
fn sold_identifier_reappearing_opens_a_new_active_row() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(1, 12));
    run_at(&mut conn, vec![honda(23_495), ford(None)], t(5, 12));
    let counts = run_at(&mut conn, vec![honda(23_495), toyota(), ford(None)], t(10, 12));

    assert_eq!(counts.new_vehicles, 1);

    let rows = all_rows(&mut conn, "STOCK_ABC123");
    assert_eq!(rows.len(), 2);
    let statuses: Vec<&str> = rows.iter().map(|r| r.status.as_str()).collect();
    assert!(statuses.contains(&"sold"));
    assert!(statuses.contains(&"active"));
}

#[test]
fn first_seen_never_after_last_seen() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    // resolver dates a listing three weeks before the run
    let now = t(22, 12);
    let resolve = |_: &ParsedVehicle| ListingDate {
        date: now - Duration::days(21),
        confidence: Confidence::Medium,
        source: Source::Sitemap,
    };
    reconcile::run(&mut conn, TENANT, vec![toyota()], resolve, now, 2).unwrap();

    let row = repo::get_active_by_identifier(&mut conn, TENANT, "STOCK_ABC123")
        .unwrap()
        .unwrap();
    assert!(row.first_seen_at <= row.last_seen_at);
    assert_eq!(row.listing_date_source, "sitemap");
    assert_eq!(row.listing_date_confidence, "medium");
}
