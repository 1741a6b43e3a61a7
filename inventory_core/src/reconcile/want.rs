//! Builds the "wanted" state for one tenant run: every parsed vehicle paired
//! with the stable identifier it resolves to, in insertion order.

use site_extractor::identifier::IdentifierAssigner;
use site_extractor::model::ParsedVehicle;

/// One parsed vehicle carrying the identifier it was assigned this run.
pub struct WantedVehicle {
    pub identifier: String,
    pub vehicle: ParsedVehicle,
}

/// Assigns identifiers to the parsed set. The collision set is per-run:
/// matching an identifier already stored in history is exactly how an
/// unchanged vehicle finds its row again, so pre-existing identifiers must
/// not trigger salting. Vehicles with no derivable identifier are dropped
/// here.
pub fn wanted_from_parsed(parsed: Vec<ParsedVehicle>) -> Vec<WantedVehicle> {
    let mut assigner = IdentifierAssigner::new();

    parsed
        .into_iter()
        .filter_map(|vehicle| match assigner.assign(&vehicle) {
            Some(identifier) => Some(WantedVehicle { identifier, vehicle }),
            None => {
                tracing::warn!(
                    url = vehicle.listing_url.as_deref().unwrap_or("<none>"),
                    "listing dropped: no vin, stock number, or year/make/model"
                );
                None
            }
        })
        .collect()
}
