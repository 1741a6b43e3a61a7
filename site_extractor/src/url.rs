//! URL normalization and relative-link resolution.
//!
//! Every dealer-supplied URL is canonicalized once at the root of a crawl so
//! the rest of the pipeline (sitemap cache keys, stable-identifier URL
//! hashes, competitor snapshot keys) can compare URLs with plain string
//! equality.

use url::Url;

use crate::errors::{ExtractError, Result};

/// Canonicalize a raw, possibly scheme-less URL.
///
/// Rules: trim whitespace, default to `https://` when no scheme is given,
/// rewrite `http` to `https`, lowercase the host, strip a leading `www.`,
/// and otherwise preserve path/query/fragment verbatim.
pub fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidUrl("empty".into()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut parsed =
        Url::parse(&with_scheme).map_err(|e| ExtractError::InvalidUrl(format!("{raw}: {e}")))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| ExtractError::InvalidUrl(raw.to_string()))?
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    if parsed.scheme() == "http" {
        parsed
            .set_scheme("https")
            .map_err(|_| ExtractError::InvalidUrl(raw.to_string()))?;
    }
    parsed
        .set_host(Some(&host))
        .map_err(|e| ExtractError::InvalidUrl(format!("{raw}: {e}")))?;

    Ok(parsed.to_string())
}

/// Resolve `rel` against `base`, normalizing the base first.
///
/// `resolve(rel, normalize(base)) == resolve(rel, base)` because both paths
/// normalize the base before joining.
pub fn resolve(rel: &str, base: &str) -> Result<String> {
    let base_norm = normalize(base)?;
    let base_url = Url::parse(&base_norm).map_err(|e| ExtractError::InvalidUrl(format!("{e}")))?;
    let joined = base_url
        .join(rel)
        .map_err(|e| ExtractError::InvalidUrl(format!("{rel}: {e}")))?;
    Ok(joined.to_string())
}
