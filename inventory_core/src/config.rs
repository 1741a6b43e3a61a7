//! Runtime settings: parsing, defaults, and environment fallbacks.
//!
//! A TOML-backed settings file holds every recognized tunable, each
//! section defaulting to the documented value when absent. The two extractor
//! endpoints may also come from the environment (`EXTRACTOR_PRIMARY_URL`,
//! `EXTRACTOR_SECONDARY_URL`) so deployments can keep service URLs out of the
//! settings file; an explicit TOML value wins over the environment.

use std::time::Duration;

use serde::Deserialize;
use shared_utils::env::get_env_var;
use site_extractor::fetch::FetchOptions;
use site_extractor::providers::ExtractorConfig;

/// Top-level settings, one section per concern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub extractor: ExtractorSettings,
    pub sitemap: SitemapSettings,
    pub dispatcher: DispatcherSettings,
    pub reconcile: ReconcileSettings,
    pub detail: DetailSettings,
}

/// HTTP fetcher tunables (`fetch.*`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_ms: u64,
    pub rate_limit_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            timeout_ms: 30_000,
            rate_limit_ms: 1_000,
        }
    }
}

/// Remote renderer endpoints (`extractor.*`). An absent endpoint means that
/// tier is skipped entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorSettings {
    pub primary_url: Option<String>,
    pub secondary_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            primary_url: None,
            secondary_url: None,
            timeout_ms: 120_000,
        }
    }
}

/// Sitemap cache TTL (`sitemap.*`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapSettings {
    pub ttl_ms: u64,
}

impl Default for SitemapSettings {
    fn default() -> Self {
        Self { ttl_ms: 86_400_000 }
    }
}

/// All-tenants run budget (`dispatcher.*`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherSettings {
    pub wall_clock_budget_ms: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            wall_clock_budget_ms: 100_000,
        }
    }
}

/// Disappearance-sweep grace window (`reconcile.*`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileSettings {
    pub sold_absence_days: i64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            sold_absence_days: 2,
        }
    }
}

/// Detail-page fan-out bound (`detail.*`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetailSettings {
    pub concurrency: usize,
}

impl Default for DetailSettings {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

impl Settings {
    /// Parse settings from a TOML string; every omitted key takes its default.
    pub fn load_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Parse settings from a TOML file path.
    pub fn load_path(path: &str) -> anyhow::Result<Self> {
        Self::load_str(&std::fs::read_to_string(path)?)
    }

    /// Fetcher options derived from the `fetch` section.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_retries: self.fetch.max_retries,
            initial_delay: Duration::from_millis(self.fetch.initial_delay_ms),
            max_delay: Duration::from_millis(self.fetch.max_delay_ms),
            timeout: Duration::from_millis(self.fetch.timeout_ms),
            rate_limit: Duration::from_millis(self.fetch.rate_limit_ms),
            validate: true,
        }
    }

    /// Extractor cascade config, falling back to `EXTRACTOR_PRIMARY_URL` /
    /// `EXTRACTOR_SECONDARY_URL` when the TOML leaves an endpoint unset.
    pub fn extractor_config(&self) -> ExtractorConfig {
        let primary = self
            .extractor
            .primary_url
            .clone()
            .or_else(|| get_env_var("EXTRACTOR_PRIMARY_URL").ok());
        let secondary = self
            .extractor
            .secondary_url
            .clone()
            .or_else(|| get_env_var("EXTRACTOR_SECONDARY_URL").ok());

        let mut config = ExtractorConfig::new(primary, secondary);
        config.timeout = Duration::from_millis(self.extractor.timeout_ms);
        config
    }

    pub fn sitemap_ttl(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.sitemap.ttl_ms as i64)
    }

    pub fn wall_clock_budget(&self) -> Duration {
        Duration::from_millis(self.dispatcher.wall_clock_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_takes_documented_defaults() {
        let s = Settings::load_str("").unwrap();
        assert_eq!(s.fetch.max_retries, 3);
        assert_eq!(s.fetch.timeout_ms, 30_000);
        assert_eq!(s.extractor.timeout_ms, 120_000);
        assert_eq!(s.sitemap.ttl_ms, 86_400_000);
        assert_eq!(s.dispatcher.wall_clock_budget_ms, 100_000);
        assert_eq!(s.reconcile.sold_absence_days, 2);
        assert_eq!(s.detail.concurrency, 5);
    }

    #[test]
    fn partial_section_overrides_only_named_keys() {
        let s = Settings::load_str("[fetch]\nmax_retries = 5\n").unwrap();
        assert_eq!(s.fetch.max_retries, 5);
        assert_eq!(s.fetch.timeout_ms, 30_000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::load_str("[fetch]\nmax_retriez = 5\n").is_err());
    }
}
