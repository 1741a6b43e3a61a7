//! Durable side of the sitemap index: one row per tenant, refreshed
//! at most once per TTL. Failures are cached too, so a dealer with no
//! sitemap is probed once a day, not once a run.

use chrono::{DateTime, Duration, Utc};
use diesel::SqliteConnection;
use site_extractor::fetch::Fetcher;
use site_extractor::sitemap::{self, SitemapIndex};

use crate::models::NewSitemapCacheRow;
use crate::repo::{self, RepoResult};
use crate::timefmt::to_rfc3339_millis;

/// A non-expired cache row, decoded. `index` is empty when the cached fetch
/// ended in `not_found`/`error`.
pub struct CachedSitemap {
    pub fetch_status: String,
    pub index: SitemapIndex,
}

/// Return the tenant's cache row if it has not expired yet.
pub fn lookup_fresh(
    conn: &mut SqliteConnection,
    tenant: &str,
    now: DateTime<Utc>,
) -> RepoResult<Option<CachedSitemap>> {
    let Some(row) = repo::get_sitemap_cache(conn, tenant)? else {
        return Ok(None);
    };
    if row.expires_at <= to_rfc3339_millis(now) {
        return Ok(None);
    }

    let entries = serde_json::from_str(&row.entries).unwrap_or_default();
    Ok(Some(CachedSitemap {
        fetch_status: row.fetch_status,
        index: SitemapIndex { entries },
    }))
}

/// Upsert the tenant's cache row with `expires_at = now + ttl`.
pub fn store(
    conn: &mut SqliteConnection,
    tenant: &str,
    website: &str,
    index: &SitemapIndex,
    fetch_status: &str,
    error_message: Option<String>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> RepoResult<()> {
    let row = NewSitemapCacheRow {
        tenant_id: tenant.to_string(),
        website: website.to_string(),
        entries: serde_json::to_string(&index.entries).unwrap_or_else(|_| "{}".to_string()),
        total_urls: index.total_urls() as i32,
        cached_at: to_rfc3339_millis(now),
        expires_at: to_rfc3339_millis(now + ttl),
        fetch_status: fetch_status.to_string(),
        error_message,
    };
    repo::upsert_sitemap_cache(conn, &row)
}

/// The cache contract: a fresh `success` row short-circuits; a fresh
/// failure row short-circuits with an empty index; otherwise discover from
/// the live site and cache whatever that produced.
pub async fn get_or_fetch(
    conn: &mut SqliteConnection,
    fetcher: &Fetcher,
    tenant: &str,
    website: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> RepoResult<SitemapIndex> {
    if let Some(cached) = lookup_fresh(conn, tenant, now)? {
        tracing::debug!(tenant, status = %cached.fetch_status, "sitemap cache hit");
        return Ok(cached.index);
    }

    let index = sitemap::discover(fetcher, website).await;
    let fetch_status = if index.entries.is_empty() { "not_found" } else { "success" };
    store(conn, tenant, website, &index, fetch_status, None, now, ttl)?;
    tracing::info!(tenant, urls = index.total_urls(), fetch_status, "sitemap cache refreshed");

    Ok(index)
}
