//! Sitemap discovery and parsing.
//!
//! This module is deliberately pure: it takes a page-fetching closure rather
//! than owning a [`crate::fetch::Fetcher`], so tests can feed it canned XML
//! without touching the network.

use std::collections::BTreeMap;

use regex::Regex;

const COMMON_SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/product-sitemap.xml",
    "/inventory-sitemap.xml",
    "/sitemap-vehicles.xml",
];

/// `path → lastmod` mapping plus bookkeeping, ready to be cached as a
/// [`crate::sitemap::SitemapIndex`] row by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapIndex {
    /// URL path (no scheme/host) to ISO-ish lastmod string.
    pub entries: BTreeMap<String, Option<String>>,
}

impl SitemapIndex {
    pub fn total_urls(&self) -> usize {
        self.entries.len()
    }
}

fn vehicle_like_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    let include = ["/vehicle", "/inventory/", "/used-", "/cars/", "-for-sale", "/detail", "/stock"];
    let exclude = ["search", "category", "tag", "page/", "blog", "news", "about", "contact"];
    if exclude.iter().any(|e| lower.contains(e)) {
        return false;
    }
    include.iter().any(|i| lower.contains(i))
}

fn is_index_child_candidate(loc: &str) -> bool {
    let lower = loc.to_lowercase();
    lower.contains("inventory") || lower.contains("vehicle") || lower.contains("car")
}

/// One `{loc, lastmod?}` entry pulled out of a `<urlset>` or `<sitemapindex>`.
struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
}

/// Parse `<url>…</url>` or `<sitemap>…</sitemap>` entries out of raw sitemap XML.
///
/// This is a line-item regex scan rather than a full XML parser: sitemap
/// documents are a flat, predictable shape and the tag-balancing rationale
/// applies to dealer-site HTML, not to machine-generated sitemap XML.
fn parse_entries(xml: &str) -> Vec<UrlEntry> {
    let block_re = Regex::new(r"(?s)<(?:url|sitemap)>(.*?)</(?:url|sitemap)>").unwrap();
    let loc_re = Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").unwrap();
    let lastmod_re = Regex::new(r"(?s)<lastmod>\s*(.*?)\s*</lastmod>").unwrap();

    block_re
        .captures_iter(xml)
        .filter_map(|c| {
            let block = c.get(1)?.as_str();
            let loc = loc_re.captures(block)?.get(1)?.as_str().trim().to_string();
            let lastmod = lastmod_re
                .captures(block)
                .and_then(|m| m.get(1))
                .map(|m| m.as_str().trim().to_string());
            Some(UrlEntry { loc, lastmod })
        })
        .collect()
}

fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

/// Extract `Sitemap:` directive targets from a `robots.txt` body.
pub fn parse_robots_sitemaps(robots_body: &str) -> Vec<String> {
    robots_body
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let rest = line
                .strip_prefix("Sitemap:")
                .or_else(|| line.strip_prefix("sitemap:"))?;
            Some(rest.trim().to_string())
        })
        .collect()
}

/// Candidate sitemap URLs to probe when `robots.txt` names none (or in
/// addition to what it names).
pub fn common_sitemap_urls(origin: &str) -> Vec<String> {
    COMMON_SITEMAP_PATHS
        .iter()
        .map(|p| format!("{origin}{p}"))
        .collect()
}

/// Result of fetching and parsing one sitemap document.
pub enum ParsedSitemap {
    /// A leaf `<urlset>` document; entries have already been filtered to
    /// vehicle-like paths.
    UrlSet(SitemapIndex),
    /// A `<sitemapindex>` document; children worth recursing into.
    Index(Vec<String>),
}

/// Parse one fetched sitemap document's body.
///
/// `base_path_of` extracts the URL path portion for entries so the returned
/// index keys on path, not full URL (matching the cache's `path → lastmod`
/// contract).
pub fn parse_sitemap_document(xml: &str, base_path_of: impl Fn(&str) -> Option<String>) -> ParsedSitemap {
    let entries = parse_entries(xml);
    if is_sitemap_index(xml) {
        let children = entries
            .into_iter()
            .map(|e| e.loc)
            .filter(|loc| is_index_child_candidate(loc))
            .collect();
        return ParsedSitemap::Index(children);
    }

    let mut index = SitemapIndex::default();
    for entry in entries {
        let Some(path) = base_path_of(&entry.loc) else {
            continue;
        };
        if vehicle_like_path(&path) {
            index.entries.insert(path, entry.lastmod);
        }
    }
    ParsedSitemap::UrlSet(index)
}

/// Discover and merge every vehicle-like sitemap entry for `website`.
///
/// Reads `robots.txt` for `Sitemap:` directives, probes the fixed list of
/// common paths, fetches each candidate, and recurses one level into any
/// sitemap index whose children look inventory-related. Fetch failures are
/// swallowed per entry — a dealer missing half its sitemaps still yields
/// whatever the other half has.
pub async fn discover(fetcher: &crate::fetch::Fetcher, website: &str) -> SitemapIndex {
    use crate::fetch::FetchOptions;

    let origin = match url::Url::parse(website) {
        Ok(u) => format!("{}://{}", u.scheme(), u.host_str().unwrap_or_default()),
        Err(_) => return SitemapIndex::default(),
    };

    let opts = FetchOptions {
        timeout: std::time::Duration::from_secs(10),
        max_retries: 1,
        validate: false,
        ..FetchOptions::default()
    };

    let mut candidates = Vec::new();
    let robots = fetcher.fetch(&format!("{origin}/robots.txt"), &opts).await;
    if let Some(body) = robots.body {
        candidates.extend(parse_robots_sitemaps(&body));
    }
    candidates.extend(common_sitemap_urls(&origin));
    candidates.sort();
    candidates.dedup();

    let mut merged = SitemapIndex::default();
    let mut queue = candidates;
    let mut depth_budget = queue.len() + 20;

    while let Some(sitemap_url) = queue.pop() {
        if depth_budget == 0 {
            break;
        }
        depth_budget -= 1;

        let result = fetcher.fetch(&sitemap_url, &opts).await;
        let Some(body) = result.body else { continue };

        match parse_sitemap_document(&body, |loc| {
            url::Url::parse(loc).ok().map(|p| p.path().to_string())
        }) {
            ParsedSitemap::UrlSet(idx) => merged.entries.extend(idx.entries),
            ParsedSitemap::Index(children) => queue.extend(children),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(u: &str) -> Option<String> {
        url::Url::parse(u).ok().map(|p| p.path().to_string())
    }

    #[test]
    fn parses_robots_sitemap_directives() {
        let body = "User-agent: *\nDisallow: /admin\nSitemap: https://dealer.test/sitemap.xml\n";
        assert_eq!(parse_robots_sitemaps(body), vec!["https://dealer.test/sitemap.xml"]);
    }

    #[test]
    fn filters_to_vehicle_like_paths() {
        let xml = r#"<urlset>
            <url><loc>https://dealer.test/inventory/used-honda-accord-2020</loc><lastmod>2025-01-01</lastmod></url>
            <url><loc>https://dealer.test/about-us</loc></url>
            <url><loc>https://dealer.test/blog/news-item</loc></url>
        </urlset>"#;
        match parse_sitemap_document(xml, path_of) {
            ParsedSitemap::UrlSet(idx) => {
                assert_eq!(idx.total_urls(), 1);
                assert!(idx.entries.contains_key("/inventory/used-honda-accord-2020"));
            }
            ParsedSitemap::Index(_) => panic!("expected urlset"),
        }
    }

    #[test]
    fn recurses_into_vehicle_named_index_children_only() {
        let xml = r#"<sitemapindex>
            <sitemap><loc>https://dealer.test/inventory-sitemap.xml</loc></sitemap>
            <sitemap><loc>https://dealer.test/page-sitemap.xml</loc></sitemap>
        </sitemapindex>"#;
        match parse_sitemap_document(xml, path_of) {
            ParsedSitemap::Index(children) => {
                assert_eq!(children, vec!["https://dealer.test/inventory-sitemap.xml".to_string()]);
            }
            ParsedSitemap::UrlSet(_) => panic!("expected index"),
        }
    }
}
