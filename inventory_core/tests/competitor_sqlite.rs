//! Competitor aggregation persistence: snapshot upsert keyed by
//! `(tenant, competitor_url)` plus the append-only scan history.

mod common;

use inventory_core::competitor::{aggregate, persist};
use inventory_core::models::MakeCount;
use site_extractor::model::ParsedVehicle;

const TENANT: &str = "t1";
const URL: &str = "https://rival-dealer.test/inventory";

fn vehicle(price: i64, mileage: i64, make: &str) -> ParsedVehicle {
    ParsedVehicle {
        price: Some(price),
        mileage: Some(mileage),
        make: Some(make.to_string()),
        ..Default::default()
    }
}

#[test]
fn scenario_six_statistics() {
    let vehicles = vec![
        vehicle(10_000, 60_000, "Toyota"),
        vehicle(20_000, 30_000, "Toyota"),
        vehicle(30_000, 20_000, "Honda"),
    ];
    let stats = aggregate(URL, &vehicles);

    assert_eq!(stats.count, 3);
    assert_eq!(stats.avg_price, Some(20_000.0));
    assert_eq!(stats.min_price, Some(10_000));
    assert_eq!(stats.max_price, Some(30_000));
    assert_eq!(stats.total_inventory_value, 60_000);
    assert_eq!(
        stats.top_makes,
        vec![
            MakeCount { make: "Toyota".to_string(), count: 2 },
            MakeCount { make: "Honda".to_string(), count: 1 },
        ]
    );
}

#[test]
fn repeat_scans_upsert_snapshot_and_append_history() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    let first = aggregate(URL, &[vehicle(10_000, 60_000, "Toyota")]);
    persist(&mut conn, TENANT, &first);
    let second = aggregate(URL, &[vehicle(10_000, 60_000, "Toyota"), vehicle(30_000, 20_000, "Honda")]);
    persist(&mut conn, TENANT, &second);

    assert_eq!(common::count(&mut conn, "competitor_snapshots"), 1);
    assert_eq!(common::count(&mut conn, "competitor_scan_history"), 2);
}

#[test]
fn distinct_urls_get_distinct_snapshots() {
    let (_db, mut conn) = common::setup_db();
    common::seed_tenant(&mut conn, TENANT, Some("https://example-dealer.test"));

    persist(&mut conn, TENANT, &aggregate(URL, &[vehicle(10_000, 60_000, "Toyota")]));
    persist(
        &mut conn,
        TENANT,
        &aggregate("https://other-rival.test/cars", &[vehicle(15_000, 45_000, "Kia")]),
    );

    assert_eq!(common::count(&mut conn, "competitor_snapshots"), 2);
}
