//! Crate-level error type for `site_extractor`.
//!
//! Mirrors the semantic error kinds named in the inventory pipeline's error
//! handling design: callers recover from these locally (log, skip, continue)
//! rather than treating them as fatal.

use thiserror::Error;

/// Errors produced while normalizing URLs, fetching pages, or parsing them.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A supplied URL has no parseable host.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {elapsed_ms}ms")]
    NetworkTimeout {
        /// URL that was being fetched.
        url: String,
        /// Elapsed time before the timeout fired.
        elapsed_ms: u64,
    },

    /// The remote server returned a non-2xx status that is not worth retrying.
    #[error("remote returned status {status} for {url}")]
    RemoteStatus {
        /// URL that was fetched.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body matched one of the known error-page heuristics.
    #[error("error page detected at {url}: {reason}")]
    ErrorPageDetected {
        /// URL that was fetched.
        url: String,
        /// Which heuristic tripped (short phrase or "too short").
        reason: String,
    },

    /// Parsing succeeded structurally but yielded zero valid vehicles.
    #[error("no vehicles parsed from {url}")]
    ParseNoVehicles {
        /// URL that was parsed.
        url: String,
    },

    /// Every configured extractor backend failed or is unconfigured.
    #[error("no extractor backend available for {url}")]
    RendererUnavailable {
        /// URL that could not be extracted.
        url: String,
    },

    /// A VIN failed the 17-character/alphabet check.
    #[error("malformed vin: {0}")]
    MalformedVin(String),

    /// A stable identifier could not be derived unambiguously for a listing.
    #[error("identifier ambiguous for listing at {0}")]
    IdentifierAmbiguous(String),

    /// Transport-level failure underneath `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
