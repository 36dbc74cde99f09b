use crate::entity_store::EntityStoreError;
use crate::token::TokenError;
use thiserror::Error;

/// Failures surfaced by the sync engine and the token manager.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("upstream catalog unavailable: {0:#}")]
    UpstreamUnavailable(anyhow::Error),

    #[error("could not acquire upstream credential: {0:#}")]
    CredentialAcquisitionFailed(anyhow::Error),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("entity store failure: {0}")]
    Store(#[from] EntityStoreError),
}

impl CatalogError {
    /// Classify a failed gateway call. Calls that never left because no
    /// credential could be obtained are told apart from upstream failures.
    pub fn upstream(err: anyhow::Error) -> Self {
        if err.chain().any(|cause| cause.is::<TokenError>()) {
            CatalogError::CredentialAcquisitionFailed(err)
        } else {
            CatalogError::UpstreamUnavailable(err)
        }
    }

    /// Short stable label used for metrics and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::UpstreamUnavailable(_) => "upstream_unavailable",
            CatalogError::CredentialAcquisitionFailed(_) => "credential_acquisition_failed",
            CatalogError::InvariantViolation(_) => "invariant_violation",
            CatalogError::Store(_) => "store",
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
