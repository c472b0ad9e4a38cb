//! Programmable providers for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chess::Side;
use evaluation::{
    CancellationToken, EngineProvider, ProviderError, RawEngineEvaluation, TablebaseLookup,
    TablebaseProvider,
};

use crate::cache::{CacheProvider, CachedPayload};
use crate::error::CacheError;

type EngineResponse = Result<Option<RawEngineEvaluation>, ProviderError>;
type TablebaseResponse = Result<TablebaseLookup, ProviderError>;

/// Board field of a FEN; responses are matched on placement only.
fn board_of(fen: &str) -> String {
    fen.split_whitespace().next().unwrap_or_default().to_string()
}

pub struct MockEngine {
    default: EngineResponse,
    by_board: HashMap<String, EngineResponse>,
    delay: Duration,
    calls: AtomicUsize,
    stops: AtomicUsize,
    sides: Mutex<Vec<Side>>,
}

impl MockEngine {
    pub fn returning(response: EngineResponse) -> Self {
        Self {
            default: response,
            by_board: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            sides: Mutex::new(Vec::new()),
        }
    }

    pub fn centipawns(cp: i32) -> Self {
        Self::returning(Ok(Some(RawEngineEvaluation::centipawns(cp))))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on(mut self, fen: &str, response: EngineResponse) -> Self {
        self.by_board.insert(board_of(fen), response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Searches that saw their cancel token fire before finishing.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn sides(&self) -> Vec<Side> {
        self.sides.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineProvider for MockEngine {
    async fn evaluate(
        &self,
        fen: &str,
        side_to_move: Side,
        cancel: &CancellationToken,
    ) -> Result<Option<RawEngineEvaluation>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sides.lock().unwrap().push(side_to_move);
        if !self.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = cancel.cancelled() => {
                    self.stops.fetch_add(1, Ordering::SeqCst);
                    return Err(ProviderError::Cancelled);
                }
            }
        }
        self.by_board
            .get(&board_of(fen))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

pub struct MockTablebase {
    default: TablebaseResponse,
    by_board: HashMap<String, TablebaseResponse>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockTablebase {
    pub fn returning(response: TablebaseResponse) -> Self {
        Self {
            default: response,
            by_board: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self::returning(Ok(TablebaseLookup::unavailable()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on(mut self, fen: &str, response: TablebaseResponse) -> Self {
        self.by_board.insert(board_of(fen), response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TablebaseProvider for MockTablebase {
    async fn lookup(
        &self,
        fen: &str,
        _cancel: &CancellationToken,
    ) -> Result<TablebaseLookup, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.by_board
            .get(&board_of(fen))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Cache backend that rejects every operation.
pub struct FailingCache;

impl FailingCache {
    fn down() -> CacheError {
        CacheError::Backend("connection refused".to_string())
    }
}

#[async_trait]
impl CacheProvider for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<CachedPayload>, CacheError> {
        Err(Self::down())
    }

    async fn set(&self, _key: &str, _value: CachedPayload, _ttl: Duration) -> Result<(), CacheError> {
        Err(Self::down())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(Self::down())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Err(Self::down())
    }
}
