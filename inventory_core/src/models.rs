//! Row types for every table in [`crate::schema`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::*;

/// One `(observed_at, price)` entry in a vehicle's append-only price history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub observed_at: DateTime<Utc>,
    pub price: i64,
}

/// One `(make, count)` entry in a competitor snapshot's top-five list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MakeCount {
    pub make: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Trial,
    Active,
    Suspended,
    Cancelled,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Trial => "trial",
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => TenantStatus::Active,
            "suspended" => TenantStatus::Suspended,
            "cancelled" => TenantStatus::Cancelled,
            _ => TenantStatus::Trial,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tenants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub status: String,
    pub subscription_tier: String,
    pub cost_settings: String,
    pub created_at: String,
}

impl Tenant {
    pub fn status(&self) -> TenantStatus {
        TenantStatus::from_str(&self.status)
    }

    /// Periodic-run eligibility: any status other than suspended/cancelled,
    /// and a website to crawl.
    pub fn is_eligible_for_periodic_run(&self) -> bool {
        !matches!(self.status(), TenantStatus::Suspended | TenantStatus::Cancelled)
            && self.website.is_some()
    }
}

/// `active | sold`; no `price_changed` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Active,
    Sold,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Sold => "sold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingDateConfidence {
    High,
    Medium,
    Low,
    Estimated,
}

impl ListingDateConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingDateConfidence::High => "high",
            ListingDateConfidence::Medium => "medium",
            ListingDateConfidence::Low => "low",
            ListingDateConfidence::Estimated => "estimated",
        }
    }
}

impl From<site_extractor::listing_date::Confidence> for ListingDateConfidence {
    fn from(c: site_extractor::listing_date::Confidence) -> Self {
        use site_extractor::listing_date::Confidence as C;
        match c {
            C::High => ListingDateConfidence::High,
            C::Medium => ListingDateConfidence::Medium,
            C::Low => ListingDateConfidence::Low,
            C::Estimated => ListingDateConfidence::Estimated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingDateSource {
    ImageFilename,
    JsonLd,
    MetaTag,
    Sitemap,
    VisibleText,
    FirstScan,
}

impl ListingDateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingDateSource::ImageFilename => "image_filename",
            ListingDateSource::JsonLd => "json_ld",
            ListingDateSource::MetaTag => "meta_tag",
            ListingDateSource::Sitemap => "sitemap",
            ListingDateSource::VisibleText => "visible_text",
            ListingDateSource::FirstScan => "first_scan",
        }
    }
}

impl From<site_extractor::listing_date::Source> for ListingDateSource {
    fn from(s: site_extractor::listing_date::Source) -> Self {
        use site_extractor::listing_date::Source as S;
        match s {
            S::ImageFilename => ListingDateSource::ImageFilename,
            S::JsonLd => ListingDateSource::JsonLd,
            S::MetaTag => ListingDateSource::MetaTag,
            S::Sitemap => ListingDateSource::Sitemap,
            S::VisibleText => ListingDateSource::VisibleText,
            S::FirstScan => ListingDateSource::FirstScan,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, AsChangeset)]
#[diesel(table_name = vehicle_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VehicleHistoryRow {
    pub id: Option<i32>,
    pub tenant_id: String,
    pub identifier: String,
    pub stock_number: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub price: Option<i64>,
    pub mileage: Option<i64>,
    pub color: Option<String>,
    pub listing_url: Option<String>,
    pub primary_image_url: Option<String>,
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub status: String,
    pub price_history: String,
    pub listing_date_confidence: String,
    pub listing_date_source: String,
}

impl VehicleHistoryRow {
    pub fn price_history_parsed(&self) -> Vec<PricePoint> {
        serde_json::from_str(&self.price_history).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = vehicle_history)]
pub struct NewVehicleHistoryRow {
    pub tenant_id: String,
    pub identifier: String,
    pub stock_number: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub price: Option<i64>,
    pub mileage: Option<i64>,
    pub color: Option<String>,
    pub listing_url: Option<String>,
    pub primary_image_url: Option<String>,
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub status: String,
    pub price_history: String,
    pub listing_date_confidence: String,
    pub listing_date_source: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sales_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SalesRecordRow {
    pub id: Option<i32>,
    pub tenant_id: String,
    pub identifier: String,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub sale_price: Option<i64>,
    pub sale_date: String,
    pub days_to_sale: i64,
    pub acquisition_cost: Option<i64>,
    pub gross_profit: Option<i64>,
    pub margin_percent: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sales_records)]
pub struct NewSalesRecordRow {
    pub tenant_id: String,
    pub identifier: String,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub sale_price: Option<i64>,
    pub sale_date: String,
    pub days_to_sale: i64,
    pub acquisition_cost: Option<i64>,
    pub gross_profit: Option<i64>,
    pub margin_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Pending,
    Success,
    Partial,
    Failed,
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::Pending => "pending",
            SnapshotStatus::Success => "success",
            SnapshotStatus::Partial => "partial",
            SnapshotStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = inventory_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InventorySnapshotRow {
    pub id: Option<i32>,
    pub tenant_id: String,
    pub started_at: String,
    pub status: String,
    pub vehicles_found: i32,
    pub duration_ms: i64,
    pub raw_data: String,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = inventory_snapshots)]
pub struct NewInventorySnapshotRow {
    pub tenant_id: String,
    pub started_at: String,
    pub status: String,
    pub vehicles_found: i32,
    pub duration_ms: i64,
    pub raw_data: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = scraping_logs)]
pub struct NewScrapingLogRow {
    pub tenant_id: String,
    pub snapshot_id: Option<i32>,
    pub level: String,
    pub message: String,
    pub detail: Option<String>,
    pub logged_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sitemap_cache)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SitemapCacheRow {
    pub tenant_id: String,
    pub website: String,
    pub entries: String,
    pub total_urls: i32,
    pub cached_at: String,
    pub expires_at: String,
    pub fetch_status: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = sitemap_cache)]
pub struct NewSitemapCacheRow {
    pub tenant_id: String,
    pub website: String,
    pub entries: String,
    pub total_urls: i32,
    pub cached_at: String,
    pub expires_at: String,
    pub fetch_status: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = competitor_snapshots)]
pub struct NewCompetitorSnapshotRow {
    pub tenant_id: String,
    pub competitor_url: String,
    pub count: i32,
    pub avg_price: Option<f64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub avg_mileage: Option<f64>,
    pub min_mileage: Option<i64>,
    pub max_mileage: Option<i64>,
    pub total_inventory_value: i64,
    pub top_makes: String,
    pub scanned_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = competitor_scan_history)]
pub struct NewCompetitorScanHistoryRow {
    pub tenant_id: String,
    pub competitor_url: String,
    pub count: i32,
    pub avg_price: Option<f64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub avg_mileage: Option<f64>,
    pub min_mileage: Option<i64>,
    pub max_mileage: Option<i64>,
    pub total_inventory_value: i64,
    pub top_makes: String,
    pub scanned_at: String,
}
