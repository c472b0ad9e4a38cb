//! Engine provider backed by one Stockfish process.

use async_trait::async_trait;
use chess::Side;
use evaluation::{CancellationToken, EngineProvider, ProviderError, RawEngineEvaluation};
use tokio::sync::Mutex;

use crate::stockfish::{EngineConfig, EngineError, StockfishEngine};

/// Requests are serialized on one process. The process is spawned on first
/// use and respawned after it dies.
pub struct StockfishProvider {
    config: EngineConfig,
    movetime_ms: u64,
    engine: Mutex<Option<StockfishEngine>>,
}

impl StockfishProvider {
    pub fn new(config: EngineConfig, movetime_ms: u64) -> Self {
        Self {
            config,
            movetime_ms,
            engine: Mutex::new(None),
        }
    }

    /// Wrap an already running engine.
    pub fn with_engine(engine: StockfishEngine, config: EngineConfig, movetime_ms: u64) -> Self {
        Self {
            config,
            movetime_ms,
            engine: Mutex::new(Some(engine)),
        }
    }

    pub fn movetime_ms(&self) -> u64 {
        self.movetime_ms
    }

    pub async fn shutdown(&self) {
        if let Some(engine) = self.engine.lock().await.take() {
            engine.shutdown().await;
        }
    }

    async fn run(
        &self,
        fen: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<RawEngineEvaluation>, ProviderError> {
        let mut guard = tokio::select! {
            guard = self.engine.lock() => guard,
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        };

        if guard.is_none() {
            let engine = StockfishEngine::spawn(self.config.clone())
                .await
                .map_err(unavailable)?;
            *guard = Some(engine);
        }
        let Some(engine) = guard.as_mut() else {
            return Err(ProviderError::Unavailable("engine not running".into()));
        };

        match engine.analyze(fen, self.movetime_ms, cancel).await {
            Ok(analysis) if analysis.stopped => Err(ProviderError::Cancelled),
            Ok(analysis) => Ok(analysis.info.map(|info| info.to_raw())),
            Err(e) => {
                if matches!(e, EngineError::Closed) {
                    tracing::warn!("Stockfish exited, will respawn on next request");
                    *guard = None;
                }
                Err(unavailable(e))
            }
        }
    }
}

fn unavailable(e: EngineError) -> ProviderError {
    ProviderError::Unavailable(e.to_string())
}

#[async_trait]
impl EngineProvider for StockfishProvider {
    async fn evaluate(
        &self,
        fen: &str,
        side_to_move: Side,
        cancel: &CancellationToken,
    ) -> Result<Option<RawEngineEvaluation>, ProviderError> {
        tracing::debug!(fen = %fen, side = %side_to_move, "Engine evaluation requested");
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        self.run(fen, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn missing_binary() -> StockfishProvider {
        let config = EngineConfig {
            path: Some(PathBuf::from("/nonexistent/stockfish-binary")),
            ..Default::default()
        };
        StockfishProvider::new(config, 100)
    }

    #[tokio::test]
    async fn test_spawn_failure_is_unavailable() {
        let result = missing_binary()
            .evaluate(
                "8/8/8/8/8/8/8/K6k w - - 0 1",
                Side::White,
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = missing_binary()
            .evaluate("8/8/8/8/8/8/8/K6k w - - 0 1", Side::White, &token)
            .await;
        assert_eq!(result, Err(ProviderError::Cancelled));
    }
}
