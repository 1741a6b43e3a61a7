//! Small helpers shared by `site_extractor` and `inventory_core`.

pub mod env;
