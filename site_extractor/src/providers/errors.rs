use thiserror::Error;

/// Errors surfaced by an individual extractor tier.
///
/// The cascade in [`crate::providers`] treats a tier failure as "try the
/// next tier" rather than fatal — only once every tier has been exhausted
/// does the caller see [`crate::errors::ExtractError::RendererUnavailable`].
/// An endpoint that answers with `success=false` or no vehicles is not an
/// error at all; [`crate::providers::remote::call`] reports it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to extractor endpoint failed: {0}")]
    Request(#[from] reqwest::Error),
}
