use evaluation::ProviderError;

use crate::observer::ProviderKind;

/// Failure inside the pipeline. Never returned by the public entry points,
/// which degrade to the "no data" sentinel instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("{provider} timed out after {ms} ms")]
    Timeout { provider: ProviderKind, ms: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("No provider returned an evaluation")]
    NoData,

    #[error("Request cancelled")]
    Cancelled,
}

impl From<chess::FenError> for ServiceError {
    fn from(e: chess::FenError) -> Self {
        Self::InvalidPosition(e.to_string())
    }
}

/// Cache backend failure. Logged and treated as a miss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}
