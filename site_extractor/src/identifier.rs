//! Stable identifier assignment.

use std::collections::HashSet;

use crate::model::ParsedVehicle;

// Empty slots keep their separator so the same attribute always lands in the
// same position: `2021_FORD_F-150__28000__37000` has no trim and no color.
fn upper_snake(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .map(|p| {
            p.as_deref()
                .map(|s| s.replace(' ', "_").to_uppercase())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn url_hash(url: Option<&str>) -> String {
    match url {
        Some(u) => {
            let tail: String = u.chars().rev().take_while(|c| c.is_alphanumeric()).collect();
            let tail: String = tail.chars().rev().collect();
            if tail.is_empty() {
                random_suffix()
            } else {
                tail.to_uppercase()
            }
        }
        None => random_suffix(),
    }
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Per-run identifier assignment for parsed vehicles, preserving insertion
/// order and resolving collisions by appending a URL-hash salt.
///
/// The collision set covers this run only. Across runs the same attributes
/// must keep producing the same identifier, or reconciliation would open a
/// fresh history row for a vehicle it has already seen; two listings that
/// genuinely share every attribute within one run are the case the salt
/// disambiguates. Tie-break goes to the earlier element, which keeps the
/// unsalted base.
#[derive(Default)]
pub struct IdentifierAssigner {
    seen: HashSet<String>,
}

impl IdentifierAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the stable identifier for `vehicle`, or `None` to skip it
    /// (no VIN, stock, or complete year/make/model triple).
    pub fn assign(&mut self, vehicle: &ParsedVehicle) -> Option<String> {
        if let Some(vin) = &vehicle.vin {
            if crate::model::is_valid_vin(vin) {
                self.seen.insert(vin.clone());
                return Some(vin.clone());
            }
        }

        if let Some(stock) = &vehicle.stock_number {
            let id = format!("STOCK_{stock}");
            self.seen.insert(id.clone());
            return Some(id);
        }

        if vehicle.year.is_some() && vehicle.make.is_some() && vehicle.model.is_some() {
            let base = upper_snake(&[
                vehicle.year.map(|y| y.to_string()),
                vehicle.make.clone(),
                vehicle.model.clone(),
                vehicle.trim.clone(),
                vehicle.mileage.map(|m| m.to_string()),
                vehicle.color.clone(),
                vehicle.price.map(|p| p.to_string()),
            ]);

            let id = if self.seen.contains(&base) {
                format!("{base}_{}", url_hash(vehicle.listing_url.as_deref()))
            } else {
                base
            };
            self.seen.insert(id.clone());
            return Some(id);
        }

        None
    }
}

/// Does `stored` look like a synthetic identifier eligible for the
/// VIN-upgrade rule? Real VINs never contain `_`; every synthetic form does.
pub fn is_synthetic(stored: &str) -> bool {
    stored.starts_with("STOCK_") || stored.contains('_')
}
