//! Provider abstractions consumed by the orchestrator.
//! Implemented by the Stockfish adapter, tablebase clients and test mocks.

use async_trait::async_trait;
use chess::Side;

use crate::cancel::CancellationToken;
use crate::raw::{RawEngineEvaluation, RawTablebaseResult};

/// Failure talking to a provider. Always recovered by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed provider response: {0}")]
    Malformed(String),
    #[error("Provider call cancelled")]
    Cancelled,
}

/// Outcome of a tablebase lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablebaseLookup {
    /// False when the position is outside the tablebase (too many pieces,
    /// service down, ...).
    pub is_available: bool,
    pub result: Option<RawTablebaseResult>,
}

impl TablebaseLookup {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn found(result: RawTablebaseResult) -> Self {
        Self {
            is_available: true,
            result: Some(result),
        }
    }

    /// The result, but only when the lookup is definitive.
    pub fn definitive(self) -> Option<RawTablebaseResult> {
        if self.is_available {
            self.result
        } else {
            None
        }
    }
}

/// Search engine. `Ok(None)` means "no data" (e.g. the search was stopped
/// before any score was reported).
#[async_trait]
pub trait EngineProvider: Send + Sync {
    async fn evaluate(
        &self,
        fen: &str,
        side_to_move: Side,
        cancel: &CancellationToken,
    ) -> Result<Option<RawEngineEvaluation>, ProviderError>;
}

/// Exact endgame lookup.
#[async_trait]
pub trait TablebaseProvider: Send + Sync {
    async fn lookup(
        &self,
        fen: &str,
        cancel: &CancellationToken,
    ) -> Result<TablebaseLookup, ProviderError>;
}

/// Tablebase that never knows anything. Used when no tablebase is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTablebase;

#[async_trait]
impl TablebaseProvider for NoTablebase {
    async fn lookup(
        &self,
        _fen: &str,
        _cancel: &CancellationToken,
    ) -> Result<TablebaseLookup, ProviderError> {
        Ok(TablebaseLookup::unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitive_requires_availability() {
        let raw = RawTablebaseResult::new(2, Some(3), Some(5));
        assert_eq!(TablebaseLookup::found(raw.clone()).definitive(), Some(raw.clone()));

        let stale = TablebaseLookup {
            is_available: false,
            result: Some(raw),
        };
        assert_eq!(stale.definitive(), None);
    }

    #[tokio::test]
    async fn test_no_tablebase_is_unavailable() {
        let lookup = NoTablebase
            .lookup("8/8/8/8/8/8/8/K6k w - - 0 1", &CancellationToken::new())
            .await
            .unwrap();
        assert!(!lookup.is_available);
    }
}
