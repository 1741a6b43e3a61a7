//! Pure fetch/parse/derive logic for the inventory reconciliation pipeline.
//!
//! Everything here is stateless with respect to persistence: no module in
//! this crate talks to a database. `inventory_core` owns the stateful half
//! (reconciliation, snapshots, the HTTP invocation surface) and calls into
//! these modules for URL handling, fetching, sitemap discovery, listing-date
//! resolution, HTML parsing, the extractor cascade, VIN enrichment, and
//! stable-identifier assignment.

pub mod errors;
pub mod fetch;
pub mod html;
pub mod identifier;
pub mod listing_date;
pub mod model;
pub mod providers;
pub mod sitemap;
pub mod url;
pub mod vin;
