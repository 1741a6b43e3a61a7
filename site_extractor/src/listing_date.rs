//! Listing-date resolution with provenance.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// How confident the resolver is in the date it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
    Estimated,
}

/// Which heuristic produced the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    ImageFilename,
    JsonLd,
    MetaTag,
    Sitemap,
    VisibleText,
    FirstScan,
}

/// A resolved listing date with provenance, ready to populate
/// `VehicleHistory::{first_seen_at, listing_date_confidence, listing_date_source}`.
#[derive(Debug, Clone)]
pub struct ListingDate {
    pub date: DateTime<Utc>,
    pub confidence: Confidence,
    pub source: Source,
}

/// Everything the resolver might look at for one newly-seen vehicle.
#[derive(Debug, Default)]
pub struct ListingDateInputs<'a> {
    /// Primary image URL, if known.
    pub image_url: Option<&'a str>,
    /// Raw JSON-LD blocks found on the page (already extracted as text).
    pub json_ld_blocks: &'a [String],
    /// `(key, value)` pairs from `<meta>` tags (`property=` or `name=`).
    pub meta_tags: &'a [(String, String)],
    /// The vehicle's own URL path, for sitemap lookup.
    pub url_path: Option<&'a str>,
    /// Tenant's cached sitemap mapping.
    pub sitemap: Option<&'a BTreeMap<String, Option<String>>>,
    /// Raw visible text of the page (or the container) to scan for phrases.
    pub visible_text: &'a str,
}

static IMAGE_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{8})").unwrap());
static JSON_LD_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""@type"\s*:\s*"(Car|Vehicle)""#).unwrap());
static JSON_LD_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:datePosted|datePublished|dateCreated|uploadDate)"\s*:\s*"([^"]+)""#).unwrap()
});
static VISIBLE_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:Listed|Posted|Added)[:\s]*(?:on\s*)?(\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|[A-Za-z]+ \d{1,2},? \d{4}|\d{4}-\d{2}-\d{2})")
        .unwrap()
});

const META_DATE_KEYS: &[&str] = &[
    "article:published_time",
    "og:updated_time",
    "datePosted",
    "pubdate",
    "DC.date",
];

fn within_reasonable_window(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let floor = now - Duration::days(365 * 3);
    let ceiling = now + Duration::days(1);
    date >= floor && date <= ceiling
}

fn parse_yyyymmdd(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn try_image_filename(url: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = IMAGE_DATE_RE.captures(url)?;
    let digits = caps.get(1)?.as_str();
    let naive = parse_yyyymmdd(digits)?;
    let dt = naive.and_hms_opt(0, 0, 0)?.and_utc();
    within_reasonable_window(dt, now).then_some(dt)
}

fn try_json_ld(blocks: &[String], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    for block in blocks {
        if !JSON_LD_TYPE_RE.is_match(block) {
            continue;
        }
        if let Some(caps) = JSON_LD_DATE_RE.captures(block) {
            let raw = caps.get(1)?.as_str();
            if let Some(dt) = parse_flexible(raw) {
                if within_reasonable_window(dt, now) {
                    return Some(dt);
                }
            }
        }
    }
    None
}

fn try_meta_tags(tags: &[(String, String)], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    for (key, value) in tags {
        if META_DATE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
            if let Some(dt) = parse_flexible(value) {
                if within_reasonable_window(dt, now) {
                    return Some(dt);
                }
            }
        }
    }
    None
}

fn try_sitemap(
    url_path: Option<&str>,
    sitemap: Option<&BTreeMap<String, Option<String>>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let path = url_path?;
    let sitemap = sitemap?;
    let lastmod = sitemap
        .get(path)
        .cloned()
        .or_else(|| {
            sitemap
                .iter()
                .find(|(k, _)| k.contains(path) || path.contains(k.as_str()))
                .map(|(_, v)| v.clone())
        })??;
    let dt = parse_flexible(&lastmod)?;
    within_reasonable_window(dt, now).then_some(dt)
}

fn try_visible_text(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = VISIBLE_TEXT_RE.captures(text)?;
    let raw = caps.get(1)?.as_str();
    let dt = parse_flexible(raw)?;
    within_reasonable_window(dt, now).then_some(dt)
}

/// Best-effort parse across the handful of date shapes this domain emits:
/// ISO 8601, `MM/DD/YYYY`, and `Month D, YYYY`.
fn parse_flexible(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(naive.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(naive) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return Some(naive.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(naive) = NaiveDate::parse_from_str(raw, "%B %d, %Y") {
        return Some(naive.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(naive) = NaiveDate::parse_from_str(raw, "%B %d %Y") {
        return Some(naive.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Run the fixed priority cascade; falls back to `now` when nothing else matched.
pub fn resolve(inputs: &ListingDateInputs, now: DateTime<Utc>) -> ListingDate {
    if let Some(url) = inputs.image_url {
        if let Some(dt) = try_image_filename(url, now) {
            return ListingDate { date: dt, confidence: Confidence::High, source: Source::ImageFilename };
        }
    }
    if let Some(dt) = try_json_ld(inputs.json_ld_blocks, now) {
        return ListingDate { date: dt, confidence: Confidence::High, source: Source::JsonLd };
    }
    if let Some(dt) = try_meta_tags(inputs.meta_tags, now) {
        return ListingDate { date: dt, confidence: Confidence::High, source: Source::MetaTag };
    }
    if let Some(dt) = try_sitemap(inputs.url_path, inputs.sitemap, now) {
        return ListingDate { date: dt, confidence: Confidence::Medium, source: Source::Sitemap };
    }
    if let Some(dt) = try_visible_text(inputs.visible_text, now) {
        return ListingDate { date: dt, confidence: Confidence::Medium, source: Source::VisibleText };
    }
    ListingDate { date: now, confidence: Confidence::Estimated, source: Source::FirstScan }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn image_filename_wins_when_present_and_reasonable() {
        let inputs = ListingDateInputs {
            image_url: Some("https://dealer.test/img/IMG_20260715_honda.jpg"),
            ..Default::default()
        };
        let result = resolve(&inputs, now());
        assert_eq!(result.source, Source::ImageFilename);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn falls_through_to_json_ld_when_image_date_unreasonable() {
        let inputs = ListingDateInputs {
            image_url: Some("https://dealer.test/img/IMG_19990101_honda.jpg"),
            json_ld_blocks: &[r#"{"@type":"Vehicle","datePosted":"2026-07-20"}"#.to_string()],
            ..Default::default()
        };
        let result = resolve(&inputs, now());
        assert_eq!(result.source, Source::JsonLd);
    }

    #[test]
    fn meta_tag_picked_up_when_no_higher_priority_hit() {
        let inputs = ListingDateInputs {
            meta_tags: &[("article:published_time".to_string(), "2026-07-01T00:00:00Z".to_string())],
            ..Default::default()
        };
        let result = resolve(&inputs, now());
        assert_eq!(result.source, Source::MetaTag);
    }

    #[test]
    fn sitemap_lookup_by_exact_path() {
        let mut sitemap = BTreeMap::new();
        sitemap.insert("/inventory/honda-accord-2020".to_string(), Some("2026-06-15".to_string()));
        let inputs = ListingDateInputs {
            url_path: Some("/inventory/honda-accord-2020"),
            sitemap: Some(&sitemap),
            ..Default::default()
        };
        let result = resolve(&inputs, now());
        assert_eq!(result.source, Source::Sitemap);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn visible_text_phrase_parsed() {
        let inputs = ListingDateInputs {
            visible_text: "Some details here. Listed: 07/15/2026 and still available.",
            ..Default::default()
        };
        let result = resolve(&inputs, now());
        assert_eq!(result.source, Source::VisibleText);
    }

    #[test]
    fn falls_back_to_first_scan() {
        let inputs = ListingDateInputs::default();
        let result = resolve(&inputs, now());
        assert_eq!(result.source, Source::FirstScan);
        assert_eq!(result.confidence, Confidence::Estimated);
        assert_eq!(result.date, now());
    }

    #[test]
    fn rejects_dates_outside_reasonable_window() {
        assert!(!within_reasonable_window(now() - Duration::days(365 * 4), now()));
        assert!(!within_reasonable_window(now() + Duration::days(2), now()));
        assert!(within_reasonable_window(now() - Duration::days(100), now()));
    }
}
