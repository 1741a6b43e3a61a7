//! Structured-data extraction strategy (step 1).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::model::ParsedVehicle;

static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#).unwrap()
});

/// Pull out the raw text of every `<script type="application/ld+json">` block.
pub fn json_ld_blocks(html: &str) -> Vec<String> {
    SCRIPT_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

fn is_vehicle_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(s)) => s == "Car" || s == "Vehicle",
        Some(Value::Array(arr)) => arr.iter().any(|v| v.as_str() == Some("Car") || v.as_str() == Some("Vehicle")),
        _ => false,
    }
}

fn as_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.chars().filter(|c| c.is_ascii_digit()).collect::<String>().parse().ok(),
        _ => None,
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn brand_name(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("name").and_then(as_str),
        _ => None,
    }
}

/// Turn one `@type: Car|Vehicle` JSON-LD object into a `ParsedVehicle`.
fn extract_one(value: &Value) -> Option<ParsedVehicle> {
    if !is_vehicle_type(value) {
        return None;
    }

    let vin = value.get("vehicleIdentificationNumber").and_then(as_str);
    let year = value
        .get("vehicleModelDate")
        .or_else(|| value.get("productionDate"))
        .and_then(as_str)
        .and_then(|s| s.get(0..4).and_then(|y| y.parse::<i32>().ok()));
    let make = value.get("brand").and_then(brand_name).map(|m| title_case(&m));
    let model = value.get("model").and_then(as_str).map(|m| title_case(&m));
    let price = value
        .get("offers")
        .and_then(|o| o.get("price"))
        .and_then(as_i64);
    let mileage = value
        .get("mileageFromOdometer")
        .and_then(|m| m.get("value"))
        .and_then(as_i64);
    let color = value.get("color").and_then(as_str);
    let listing_url = value.get("url").and_then(as_str);
    let image_urls: Vec<String> = match value.get("image") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(arr)) => arr.iter().filter_map(as_str).collect(),
        _ => Vec::new(),
    };
    let primary_image_url = image_urls.first().cloned();

    Some(ParsedVehicle {
        vin,
        year,
        make,
        model,
        price,
        mileage,
        color,
        listing_url,
        primary_image_url,
        image_urls,
        ..Default::default()
    })
}

/// Run the structured-data strategy over a whole page: every JSON-LD block,
/// each parsed as a value and walked uniformly whether it's an array, a
/// `@graph` wrapper, or a single object.
pub fn extract(html: &str) -> Vec<ParsedVehicle> {
    let mut out = Vec::new();
    for block in json_ld_blocks(html) {
        let Ok(value) = serde_json::from_str::<Value>(&block) else {
            continue;
        };
        walk(&value, &mut out);
    }
    out.into_iter().filter(|v| v.is_valid()).collect()
}

fn walk(value: &Value, out: &mut Vec<ParsedVehicle>) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(obj) => {
            if let Some(graph) = obj.get("@graph") {
                walk(graph, out);
                return;
            }
            if let Some(v) = extract_one(value) {
                out.push(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_vehicle_block() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@type":"Vehicle","vehicleIdentificationNumber":"1HGCV1F30LA012345",
             "brand":{"name":"honda"},"model":"accord","vehicleModelDate":"2020",
             "offers":{"price":23495},"mileageFromOdometer":{"value":42000}}
            </script>
        </head></html>"#;
        let vehicles = extract(html);
        assert_eq!(vehicles.len(), 1);
        let v = &vehicles[0];
        assert_eq!(v.vin.as_deref(), Some("1HGCV1F30LA012345"));
        assert_eq!(v.make.as_deref(), Some("Honda"));
        assert_eq!(v.model.as_deref(), Some("Accord"));
        assert_eq!(v.year, Some(2020));
        assert_eq!(v.price, Some(23495));
    }

    #[test]
    fn handles_graph_wrapper_and_arrays() {
        let html = r#"<script type="application/ld+json">
            {"@graph":[{"@type":"Vehicle","brand":"Ford","model":"F-150","vehicleModelDate":"2021"}]}
        </script>"#;
        let vehicles = extract(html);
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].make.as_deref(), Some("Ford"));
    }

    #[test]
    fn ignores_non_vehicle_types() {
        let html = r#"<script type="application/ld+json">{"@type":"Organization","name":"Dealer"}</script>"#;
        assert!(extract(html).is_empty());
    }
}
