//! Classifies a tenant's wanted set against current history into the writes
//! the engine must perform: inserts, merges, and sold transitions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{NewVehicleHistoryRow, PricePoint, VehicleHistoryRow};
use crate::reconcile::want::WantedVehicle;
use crate::timefmt::to_rfc3339_millis;

pub struct SoldTransition {
    pub id: i32,
    pub tenant_id: String,
    pub identifier: String,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub sale_price: Option<i64>,
    pub first_seen_at: String,
    pub sale_date: String,
    pub days_to_sale: i64,
}

#[derive(Default)]
pub struct ReconcileDiff {
    pub inserts: Vec<NewVehicleHistoryRow>,
    pub updates: Vec<VehicleHistoryRow>,
    pub sold: Vec<SoldTransition>,
}

/// `floor((today - first_seen_at)/1d)` for `SalesRecord.days_to_sale`.
fn days_to_sale(first_seen_at: &str, today: DateTime<Utc>) -> i64 {
    match DateTime::parse_from_rfc3339(first_seen_at) {
        Ok(dt) => (today.date_naive() - dt.with_timezone(&Utc).date_naive())
            .num_days()
            .max(0),
        Err(_) => 0,
    }
}

/// Merges non-empty incoming fields onto an existing active row
/// and appends a price-history entry when the price moved.
/// `status` is never touched here — price changes stay `active`.
fn merge_update(existing: &mut VehicleHistoryRow, wanted: &WantedVehicle, now: DateTime<Utc>) {
    let v = &wanted.vehicle;
    existing.last_seen_at = to_rfc3339_millis(now);

    if let Some(stock) = &v.stock_number {
        existing.stock_number = Some(stock.clone());
    }
    if v.year.is_some() {
        existing.year = v.year;
    }
    if v.make.is_some() {
        existing.make = v.make.clone();
    }
    if v.model.is_some() {
        existing.model = v.model.clone();
    }
    if v.trim.is_some() {
        existing.trim = v.trim.clone();
    }
    if v.mileage.is_some() {
        existing.mileage = v.mileage;
    }
    if v.color.is_some() {
        existing.color = v.color.clone();
    }
    if v.listing_url.is_some() {
        existing.listing_url = v.listing_url.clone();
    }
    if v.primary_image_url.is_some() {
        existing.primary_image_url = v.primary_image_url.clone();
    }

    if let Some(incoming_price) = v.price {
        if existing.price != Some(incoming_price) {
            let mut history = existing.price_history_parsed();
            history.push(PricePoint { observed_at: now, price: incoming_price });
            existing.price_history = serde_json::to_string(&history).unwrap_or_default();
            existing.price = Some(incoming_price);
        }
    }

    // Identifier upgrade: a synthetic id is replaced once a real VIN
    // shows up on a matched row, but the row keeps its primary key.
    if site_extractor::identifier::is_synthetic(&existing.identifier) {
        if let Some(vin) = &v.vin {
            if site_extractor::model::is_valid_vin(vin) {
                existing.identifier = vin.clone();
            }
        }
    }
}

/// Finds the current active row this wanted vehicle should update, if any.
/// Primary match is by identifier; when that misses and the vehicle now
/// carries a VIN, a synthetic row sharing the same listing URL or stock
/// number is treated as the same vehicle (identifier upgrade).
fn find_match<'a>(
    wanted: &WantedVehicle,
    by_identifier: &HashMap<&'a str, usize>,
    current: &'a [VehicleHistoryRow],
) -> Option<usize> {
    if let Some(&idx) = by_identifier.get(wanted.identifier.as_str()) {
        return Some(idx);
    }

    let vin_is_new = wanted
        .vehicle
        .vin
        .as_deref()
        .is_some_and(site_extractor::model::is_valid_vin);
    if !vin_is_new {
        return None;
    }

    current.iter().position(|row| {
        site_extractor::identifier::is_synthetic(&row.identifier)
            && ((wanted.vehicle.listing_url.is_some() && row.listing_url == wanted.vehicle.listing_url)
                || (wanted.vehicle.stock_number.is_some() && row.stock_number == wanted.vehicle.stock_number))
    })
}

pub fn make_diff(
    tenant: &str,
    wanted: Vec<WantedVehicle>,
    mut current: Vec<VehicleHistoryRow>,
    now: DateTime<Utc>,
    sold_absence_days: i64,
    listing_dates: &HashMap<String, site_extractor::listing_date::ListingDate>,
) -> ReconcileDiff {
    let mut diff = ReconcileDiff::default();
    let mut matched = vec![false; current.len()];
    let mut current_run_identifiers: std::collections::HashSet<String> =
        wanted.iter().map(|w| w.identifier.clone()).collect();

    for wanted_vehicle in wanted {
        let by_identifier: HashMap<&str, usize> = current
            .iter()
            .enumerate()
            .map(|(i, row)| (row.identifier.as_str(), i))
            .collect();

        match find_match(&wanted_vehicle, &by_identifier, &current) {
            Some(idx) => {
                matched[idx] = true;
                merge_update(&mut current[idx], &wanted_vehicle, now);
                current_run_identifiers.insert(current[idx].identifier.clone());
                diff.updates.push(current[idx].clone());
            }
            None => {
                let v = &wanted_vehicle.vehicle;
                let resolved = listing_dates.get(&wanted_vehicle.identifier);
                let first_seen = resolved.map(|d| d.date).unwrap_or(now);
                let confidence = resolved
                    .map(|d| crate::models::ListingDateConfidence::from(d.confidence))
                    .unwrap_or(crate::models::ListingDateConfidence::Estimated);
                let source = resolved
                    .map(|d| crate::models::ListingDateSource::from(d.source))
                    .unwrap_or(crate::models::ListingDateSource::FirstScan);

                let price_history = v
                    .price
                    .map(|price| vec![PricePoint { observed_at: now, price }])
                    .unwrap_or_default();

                diff.inserts.push(NewVehicleHistoryRow {
                    tenant_id: tenant.to_string(),
                    identifier: wanted_vehicle.identifier,
                    stock_number: v.stock_number.clone(),
                    year: v.year,
                    make: v.make.clone(),
                    model: v.model.clone(),
                    trim: v.trim.clone(),
                    price: v.price,
                    mileage: v.mileage,
                    color: v.color.clone(),
                    listing_url: v.listing_url.clone(),
                    primary_image_url: v.primary_image_url.clone(),
                    first_seen_at: to_rfc3339_millis(first_seen),
                    last_seen_at: to_rfc3339_millis(now),
                    status: crate::models::VehicleStatus::Active.as_str().to_string(),
                    price_history: serde_json::to_string(&price_history).unwrap_or_default(),
                    listing_date_confidence: confidence.as_str().to_string(),
                    listing_date_source: source.as_str().to_string(),
                });
            }
        }
    }

    let threshold = now - chrono::Duration::days(sold_absence_days);
    let threshold_str = to_rfc3339_millis(threshold);

    for (idx, row) in current.into_iter().enumerate() {
        if matched[idx] {
            continue;
        }
        if current_run_identifiers.contains(&row.identifier) {
            continue;
        }
        if row.last_seen_at >= threshold_str {
            continue;
        }
        let id = match row.id {
            Some(id) => id,
            None => continue,
        };
        let days = days_to_sale(&row.first_seen_at, now);
        diff.sold.push(SoldTransition {
            id,
            tenant_id: tenant.to_string(),
            identifier: row.identifier,
            year: row.year,
            make: row.make,
            model: row.model,
            sale_price: row.price,
            first_seen_at: row.first_seen_at,
            sale_date: now.date_naive().format("%Y-%m-%d").to_string(),
            days_to_sale: days,
        });
    }

    diff
}
