//! HTML parsing via cascading strategies.

pub mod container;
pub mod extract;
pub mod jsonld;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::ParsedVehicle;

static ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a\s+[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap());
static TAG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20[0-3]\d)\b").unwrap());
static HREF_VEHICLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(/vehicle|/inventory/|/cars/|/used-|-for-sale|/detail|\d+)").unwrap());
static CONTAINER_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(div|article|li|section)(?:\s[^>]*)?>").unwrap());

const REJECTED_HREFS: &[&str] = &["#", "/", "/search"];

fn strip_tags(html: &str) -> String {
    TAG_STRIP_RE.replace_all(html, " ").to_string()
}

fn looks_like_vehicle_link(href: &str, link_text: &str) -> bool {
    let href = href.trim();
    if REJECTED_HREFS.contains(&href) {
        return false;
    }
    let text_has_signal = YEAR_RE.is_match(link_text) || extract::extract_make(link_text).is_some();
    text_has_signal || HREF_VEHICLE_RE.is_match(href)
}

/// Parse a page's HTML into zero or more valid vehicles, base URL used to
/// resolve relative links and images.
///
/// Strategies run in order; the first to yield ≥1 valid vehicle wins.
pub fn parse(html: &str, base_url: &str) -> Vec<ParsedVehicle> {
    let structured = jsonld::extract(html);
    if !structured.is_empty() {
        return structured;
    }

    let cards = vehicle_card_strategy(html, base_url);
    if !cards.is_empty() {
        return cards;
    }

    generic_section_strategy(html, base_url)
}

fn current_year() -> i32 {
    use chrono::Datelike;
    chrono::Utc::now().year()
}

fn vehicle_card_strategy(html: &str, base_url: &str) -> Vec<ParsedVehicle> {
    let mut out = Vec::new();
    for caps in ANCHOR_RE.captures_iter(html) {
        let href = caps.get(1).unwrap().as_str();
        let link_text = strip_tags(caps.get(2).unwrap().as_str());
        if !looks_like_vehicle_link(href, &link_text) {
            continue;
        }
        let link_pos = caps.get(0).unwrap().start();
        let Some(container_html) = container::nearest_enclosing(html, link_pos) else {
            continue;
        };
        let detail_url = crate::url::resolve(href, base_url).ok();
        if let Some(v) = parse_container(container_html, base_url, detail_url) {
            out.push(v);
        }
    }
    out.into_iter().filter(|v| v.is_valid()).collect()
}

fn generic_section_strategy(html: &str, base_url: &str) -> Vec<ParsedVehicle> {
    let opens: Vec<usize> = CONTAINER_OPEN_RE.find_iter(html).map(|m| m.start()).collect();
    let mut out = Vec::new();
    for window in opens.windows(2) {
        let segment = &html[window[0]..window[1]];
        let text = strip_tags(segment);
        let has_year = YEAR_RE.is_match(&text);
        let has_make = extract::extract_make(&text).is_some();
        if has_year && has_make {
            if let Some(v) = parse_container(segment, base_url, None) {
                out.push(v);
            }
        }
    }
    out.into_iter().filter(|v| v.is_valid()).collect()
}

fn parse_container(container_html: &str, base_url: &str, detail_url: Option<String>) -> Option<ParsedVehicle> {
    let text = strip_tags(container_html);
    let vin = extract::extract_vin(&text);
    let stock_number = extract::extract_stock(&text);
    let year = extract::extract_year(&text, current_year());
    let make = extract::extract_make(&text);
    let model = make.as_ref().and_then(|m| extract::extract_model(&text, m));
    let price = extract::extract_price(&text);
    let mileage = extract::extract_mileage(&text);
    let color = extract::extract_color(&text);
    let primary_image_url = extract::extract_primary_image(container_html, base_url);
    let image_date = primary_image_url.as_deref().and_then(image_date_from_filename);

    Some(ParsedVehicle {
        vin,
        stock_number,
        year,
        make,
        model,
        price,
        mileage,
        color,
        listing_url: detail_url,
        primary_image_url,
        image_date,
        ..Default::default()
    })
}

static META_PROP_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\s+(?:property|name)\s*=\s*["']([^"']+)["']\s+content\s*=\s*["']([^"']+)["']"#)
        .unwrap()
});
static META_CONTENT_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\s+content\s*=\s*["']([^"']+)["']\s+(?:property|name)\s*=\s*["']([^"']+)["']"#)
        .unwrap()
});

/// Every `<a href=…>` target on the page, in document order.
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    ANCHOR_RE
        .captures_iter(html)
        .map(|c| c.get(1).unwrap().as_str().to_string())
        .collect()
}

/// `(key, value)` pairs from `<meta>` tags, accepting both `property=` and
/// `name=` and either attribute ordering.
pub fn meta_tags(html: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for caps in META_PROP_FIRST_RE.captures_iter(html) {
        out.push((caps[1].to_string(), caps[2].to_string()));
    }
    for caps in META_CONTENT_FIRST_RE.captures_iter(html) {
        out.push((caps[2].to_string(), caps[1].to_string()));
    }
    out
}

/// The page's visible text: everything outside tags, scripts, and styles.
pub fn visible_text(html: &str) -> String {
    static SCRIPT_STYLE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
    let without_blocks = SCRIPT_STYLE_RE.replace_all(html, " ");
    strip_tags(&without_blocks)
}

static IMAGE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:img|photo|vehicle|car|dsc|pic)[^/]*?[-_]?(\d{8})").unwrap()
});

/// Image date from one filename: `IMG[-_]YYYYMMDD`/`photo[-_]YYYYMMDD`/bare
/// `YYYYMMDD` in a stem containing one of `img|photo|vehicle|car|dsc|pic`.
pub fn image_date_from_filename(url: &str) -> Option<chrono::NaiveDate> {
    let caps = IMAGE_DATE_RE.captures(url)?;
    let digits = caps.get(1)?.as_str();
    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(year, month, day)
}

/// When a listing exposes several images, a filename date is trusted only if
/// at least two images carry dates within a 7-day window; the earlier of the
/// corroborating pair wins. A photographer's batch upload agrees on dates,
/// stray stock imagery does not.
pub fn corroborated_image_date(urls: &[String]) -> Option<chrono::NaiveDate> {
    let dates: Vec<chrono::NaiveDate> =
        urls.iter().filter_map(|u| image_date_from_filename(u)).collect();
    for (i, a) in dates.iter().enumerate() {
        for b in &dates[i + 1..] {
            if (*a - *b).num_days().abs() <= 7 {
                return Some((*a).min(*b));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_card_strategy_extracts_one_per_card() {
        let html = concat!(
            r#"<div class="card"><h3>2020 Honda Accord</h3><a href="/vehicle/1">Details</a><span>$23,495</span><span>42,000 miles</span></div>"#,
            r#"<div class="card"><h3>2019 Toyota Camry</h3><a href="/vehicle/2">Details</a><span>$21,000</span><span>51,000 miles</span></div>"#,
        );
        let vehicles = parse(html, "https://dealer.test");
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].make.as_deref(), Some("Honda"));
        assert_eq!(vehicles[1].make.as_deref(), Some("Toyota"));
    }

    #[test]
    fn structured_data_wins_when_present() {
        let html = r#"<script type="application/ld+json">{"@type":"Vehicle","brand":"Ford","model":"F-150","vehicleModelDate":"2021"}</script>
            <div class="card"><h3>2020 Honda Accord</h3><a href="/vehicle/1">Details</a><span>$23,495</span></div>"#;
        let vehicles = parse(html, "https://dealer.test");
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].make.as_deref(), Some("Ford"));
    }

    #[test]
    fn rejects_search_and_bare_hrefs() {
        assert!(!looks_like_vehicle_link("/search", "results"));
        assert!(!looks_like_vehicle_link("#", "top"));
        assert!(looks_like_vehicle_link("/vehicle/42", "Details"));
    }

    #[test]
    fn href_pattern_alone_is_enough_when_container_has_signal() {
        let html = r#"<div class="card"><h3>2022 Subaru Outback</h3><a href="/detail?id=42">View</a><span>$31,000</span></div>"#;
        let vehicles = parse(html, "https://dealer.test");
        assert_eq!(vehicles.len(), 1);
    }

    #[test]
    fn meta_tags_parsed_in_both_attribute_orders() {
        let html = concat!(
            r#"<meta property="article:published_time" content="2026-07-01T00:00:00Z">"#,
            r#"<meta content="2026-07-02" name="datePosted">"#,
        );
        let tags = meta_tags(html);
        assert!(tags.contains(&("article:published_time".to_string(), "2026-07-01T00:00:00Z".to_string())));
        assert!(tags.contains(&("datePosted".to_string(), "2026-07-02".to_string())));
    }

    #[test]
    fn visible_text_drops_scripts_and_tags() {
        let html = r#"<div>Listed: 07/15/2026<script>var x = "hidden";</script></div>"#;
        let text = visible_text(html);
        assert!(text.contains("Listed: 07/15/2026"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn image_date_extracted_from_recognizable_filename() {
        assert_eq!(
            image_date_from_filename("https://dealer.test/img/IMG_20260715_honda.jpg"),
            chrono::NaiveDate::from_ymd_opt(2026, 7, 15)
        );
        assert_eq!(image_date_from_filename("https://dealer.test/img/random.jpg"), None);
    }

    #[test]
    fn image_date_corroboration_requires_two_close_dates() {
        let agreeing = vec![
            "https://dealer.test/img/IMG_20260715_front.jpg".to_string(),
            "https://dealer.test/img/IMG_20260717_rear.jpg".to_string(),
        ];
        assert_eq!(
            corroborated_image_date(&agreeing),
            chrono::NaiveDate::from_ymd_opt(2026, 7, 15)
        );

        let disagreeing = vec![
            "https://dealer.test/img/IMG_20260715_front.jpg".to_string(),
            "https://dealer.test/img/IMG_20250101_stock.jpg".to_string(),
        ];
        assert_eq!(corroborated_image_date(&disagreeing), None);
    }
}
