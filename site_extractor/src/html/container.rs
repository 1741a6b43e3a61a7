//! Balanced-tag "nearest enclosing block" matching.

use once_cell::sync::Lazy;
use regex::Regex;

const CONTAINER_TAGS: &[&str] = &["div", "article", "li", "section"];

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20[0-3]\d)\b").unwrap());
static PRICE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[\d,]+").unwrap());
static MILEAGE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b[\d,]+\s*(mi|miles|km)\b").unwrap());

struct TagMatch {
    tag: String,
    is_close: bool,
    start: usize,
    end: usize,
}

fn scan_tags<'a>(html: &'a str, tags: &[&str]) -> Vec<TagMatch> {
    let alternation = tags.join("|");
    let re = Regex::new(&format!(r"(?i)<(/?)({alternation})(?:\s[^>]*)?>")).unwrap();
    re.captures_iter(html)
        .map(|c| {
            let whole = c.get(0).unwrap();
            TagMatch {
                tag: c.get(2).unwrap().as_str().to_lowercase(),
                is_close: c.get(1).unwrap().as_str() == "/",
                start: whole.start(),
                end: whole.end(),
            }
        })
        .collect()
}

fn contains_vehicle_tokens(segment: &str) -> bool {
    YEAR_TOKEN.is_match(segment) || PRICE_TOKEN.is_match(segment) || MILEAGE_TOKEN.is_match(segment)
}

/// Find the smallest container (by tag name in [`CONTAINER_TAGS`]) whose
/// open/close span properly encloses `link_pos` and whose content carries at
/// least one vehicle-like token.
///
/// Scans backward from `link_pos` for candidate openers, then forward from
/// each to find its matching close by tracking nesting depth, exactly as
/// described in the container-matching design note: this is what prevents a
/// regex window from bleeding into an adjacent card.
pub fn nearest_enclosing(html: &str, link_pos: usize) -> Option<&str> {
    let tags = scan_tags(html, CONTAINER_TAGS);

    let mut opener_candidates: Vec<&TagMatch> = tags
        .iter()
        .filter(|t| !t.is_close && t.start < link_pos)
        .collect();
    opener_candidates.sort_by_key(|t| std::cmp::Reverse(t.start));

    for opener in opener_candidates {
        if let Some(close_end) = matching_close(&tags, opener) {
            if close_end <= link_pos {
                continue;
            }
            let segment = &html[opener.start..close_end];
            if contains_vehicle_tokens(segment) {
                return Some(segment);
            }
        }
    }
    None
}

fn matching_close(tags: &[TagMatch], opener: &TagMatch) -> Option<usize> {
    let mut depth = 0i32;
    for t in tags {
        if t.start < opener.start || t.tag != opener.tag {
            continue;
        }
        if t.start == opener.start && !t.is_close {
            depth = 1;
            continue;
        }
        if t.start <= opener.start {
            continue;
        }
        if t.is_close {
            depth -= 1;
            if depth == 0 {
                return Some(t.end);
            }
        } else {
            depth += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_enclosing_div_with_vehicle_tokens() {
        let html = r#"<div class="card"><h3>2020 Honda Accord</h3><a href="/vehicle/1">View</a><span>$23,495</span></div>"#;
        let link_pos = html.find("<a href").unwrap();
        let container = nearest_enclosing(html, link_pos).unwrap();
        assert!(container.contains("2020 Honda Accord"));
        assert!(container.contains("$23,495"));
    }

    #[test]
    fn does_not_bleed_into_adjacent_sibling_card() {
        let html = concat!(
            r#"<div class="card"><h3>2020 Honda Accord</h3><span>$23,495</span></div>"#,
            r#"<div class="card"><h3>2019 Toyota Camry</h3><a href="/vehicle/2">View</a><span>$21,000</span></div>"#,
        );
        let link_pos = html.find("<a href").unwrap();
        let container = nearest_enclosing(html, link_pos).unwrap();
        assert!(container.contains("Camry"));
        assert!(!container.contains("Accord"));
    }

    #[test]
    fn handles_nested_containers_correctly() {
        let html = r#"<article><div class="inner"><h3>2021 Ford F-150</h3></div><a href="/vehicle/3">View</a><span>150,000 miles</span></article>"#;
        let link_pos = html.find("<a href").unwrap();
        let container = nearest_enclosing(html, link_pos).unwrap();
        assert!(container.starts_with("<article>"));
    }

    #[test]
    fn returns_none_when_no_vehicle_tokens_in_any_enclosing_container() {
        let html = r#"<div class="nav"><a href="/about">About</a></div>"#;
        let link_pos = html.find("<a href").unwrap();
        assert!(nearest_enclosing(html, link_pos).is_none());
    }
}
