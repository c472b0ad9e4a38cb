//! Unified evaluation service.
//!
//! Sources evaluations from the tablebase (authoritative, tried first) and
//! the engine (fallback), normalizes them, caches them, and serves them as
//! formatted, perspective, dual or move-quality results. The public entry
//! points never fail: any pipeline error degrades to the "no data" result.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chess::{PositionStatus, Side};
use evaluation::{
    classify_move, format_evaluation, normalize_engine, normalize_tablebase, to_perspective,
    CancellationToken, EngineProvider, FormattedEvaluation, FormatterConfig, MoveQualityResult,
    NoTablebase, NormalizedEvaluation, PerspectiveEvaluation, ProviderError, RawEngineEvaluation,
    RawTablebaseResult, TablebaseProvider,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::applier::{MoveApplier, StandardMoveApplier};
use crate::cache::{cache_key, CacheProvider, CachedPayload, MemoryCacheProvider, PayloadKind};
use crate::config::{ServiceConfig, Strategy};
use crate::dedup::Deduplicator;
use crate::error::ServiceError;
use crate::observer::{
    EvaluationObserver, NoopObserver, ProviderKind, ProviderOutcome, ServiceEvent,
};
use crate::priority_cache::{Prioritized, PriorityCache, CRITICAL_SCORE_CP};

/// How long a cancelled engine search is still polled so it can send `stop`
/// and drain its output.
const ENGINE_STOP_GRACE: Duration = Duration::from_millis(250);

/// Engine and tablebase views of one position, for side-by-side display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualEvaluation {
    pub engine: FormattedEvaluation,
    pub tablebase: Option<FormattedEvaluation>,
}

/// White-relative provider results for one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvaluation {
    /// Tablebase result when available, else the engine result.
    pub primary: NormalizedEvaluation,
    pub engine: Option<NormalizedEvaluation>,
    pub tablebase: Option<NormalizedEvaluation>,
    pub piece_count: u32,
}

impl ProviderEvaluation {
    fn single(evaluation: NormalizedEvaluation, piece_count: u32) -> Self {
        let (engine, tablebase) = if evaluation.is_tablebase() {
            (None, Some(evaluation.clone()))
        } else {
            (Some(evaluation.clone()), None)
        };
        Self {
            primary: evaluation,
            engine,
            tablebase,
            piece_count,
        }
    }

    /// Both providers answered.
    pub fn is_hybrid(&self) -> bool {
        self.engine.is_some() && self.tablebase.is_some()
    }
}

impl Prioritized for ProviderEvaluation {
    fn piece_count(&self) -> Option<u32> {
        Some(self.piece_count)
    }

    fn is_critical(&self) -> bool {
        self.tablebase.is_some() || self.primary.is_critical(CRITICAL_SCORE_CP)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub pending: usize,
    pub active_keys: Vec<String>,
    pub position_cache_size: usize,
}

/// A validated position.
#[derive(Debug, Clone)]
struct Position {
    /// Canonical FEN; key for every cache and the deduplicator.
    fen: String,
    side: Side,
    pieces: u32,
    status: PositionStatus,
}

impl Position {
    fn inspect(fen: &str) -> Result<Self, ServiceError> {
        let board = chess::parse_fen(fen)?;
        let summary = chess::summarize(&board);
        Ok(Self {
            fen: chess::format_fen(&board),
            side: summary.side_to_move,
            pieces: summary.pieces,
            status: summary.status,
        })
    }

    /// Positions that need no provider: mate on the board, or no moves left.
    /// Within tablebase range the answer takes the tablebase form so it
    /// compares like-for-like with its tablebase-backed neighbours.
    fn terminal_evaluation(&self, tablebase_max_pieces: u32) -> Option<NormalizedEvaluation> {
        if self.pieces <= tablebase_max_pieces {
            let raw = match self.status {
                PositionStatus::Checkmate => RawTablebaseResult::new(-2, Some(0), Some(0)),
                PositionStatus::Drawn => RawTablebaseResult::new(0, Some(0), None),
                PositionStatus::Ongoing => return None,
            };
            return Some(normalize_tablebase(Some(&raw), self.side));
        }

        let raw = match self.status {
            PositionStatus::Checkmate => RawEngineEvaluation::mate_in(0),
            PositionStatus::Drawn => RawEngineEvaluation::centipawns(0),
            PositionStatus::Ongoing => return None,
        };
        Some(normalize_engine(Some(&raw), self.side))
    }
}

pub struct EvaluationServiceBuilder {
    config: ServiceConfig,
    engine: Arc<dyn EngineProvider>,
    tablebase: Arc<dyn TablebaseProvider>,
    cache: Option<Arc<dyn CacheProvider>>,
    applier: Arc<dyn MoveApplier>,
    observer: Arc<dyn EvaluationObserver>,
}

impl EvaluationServiceBuilder {
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tablebase(mut self, tablebase: Arc<dyn TablebaseProvider>) -> Self {
        self.tablebase = tablebase;
        self
    }

    /// Result cache backend. Defaults to [`MemoryCacheProvider`].
    pub fn cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn applier(mut self, applier: Arc<dyn MoveApplier>) -> Self {
        self.applier = applier;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn EvaluationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> EvaluationService {
        let caching = self.config.enable_caching;
        let cache = if caching {
            Some(
                self.cache
                    .unwrap_or_else(|| Arc::new(MemoryCacheProvider::new()) as Arc<dyn CacheProvider>),
            )
        } else {
            None
        };
        let position_capacity = if caching {
            self.config.position_cache_size
        } else {
            0
        };

        EvaluationService {
            inner: Arc::new(Inner {
                formatter: self.config.formatter_config(),
                config: self.config,
                engine: self.engine,
                tablebase: self.tablebase,
                cache,
                applier: self.applier,
                observer: self.observer,
                positions: Mutex::new(PriorityCache::new(position_capacity)),
                dedup: Deduplicator::new(),
            }),
        }
    }
}

struct Inner {
    config: ServiceConfig,
    formatter: FormatterConfig,
    engine: Arc<dyn EngineProvider>,
    tablebase: Arc<dyn TablebaseProvider>,
    cache: Option<Arc<dyn CacheProvider>>,
    applier: Arc<dyn MoveApplier>,
    observer: Arc<dyn EvaluationObserver>,
    positions: Mutex<PriorityCache<ProviderEvaluation>>,
    dedup: Deduplicator<ProviderEvaluation, ServiceError>,
}

impl Inner {
    fn emit(&self, event: ServiceEvent) {
        self.observer.on_event(&event);
    }

    fn positions(&self) -> MutexGuard<'_, PriorityCache<ProviderEvaluation>> {
        self.positions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn format(&self, normalized: &NormalizedEvaluation, perspective: Side) -> FormattedEvaluation {
        format_evaluation(&to_perspective(Some(normalized), perspective), &self.formatter)
    }

    async fn cache_get(&self, key: &str, kind: PayloadKind) -> Option<CachedPayload> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(payload)) if payload.kind() == kind => {
                tracing::debug!(key = %key, "Cache hit");
                self.emit(ServiceEvent::CacheHit { kind });
                Some(payload)
            }
            Ok(_) => {
                self.emit(ServiceEvent::CacheMiss { kind });
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                self.emit(ServiceEvent::CacheError);
                None
            }
        }
    }

    async fn cache_set(&self, key: &str, payload: CachedPayload) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(e) = cache.set(key, payload, self.config.cache_ttl()).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
            self.emit(ServiceEvent::CacheError);
        }
    }

    fn provider_call(&self, provider: ProviderKind, outcome: ProviderOutcome, started: Instant) {
        self.emit(ServiceEvent::ProviderCall {
            provider,
            outcome,
            latency: started.elapsed(),
        });
    }

    /// Definitive tablebase result, or `None` for anything else.
    async fn fetch_tablebase(
        &self,
        pos: &Position,
        cancel: &CancellationToken,
    ) -> Option<NormalizedEvaluation> {
        let started = Instant::now();
        if pos.pieces > self.config.tablebase_max_pieces {
            tracing::debug!(pieces = pos.pieces, "Too many pieces for tablebase");
            self.provider_call(ProviderKind::Tablebase, ProviderOutcome::Skipped, started);
            return None;
        }

        let lookup = self.tablebase.lookup(&pos.fen, cancel);
        let (outcome, result) = match tokio::time::timeout(self.config.tablebase_timeout(), lookup).await {
            Ok(Ok(lookup)) => match lookup.definitive() {
                Some(raw) => (
                    ProviderOutcome::Success,
                    Some(normalize_tablebase(Some(&raw), pos.side)),
                ),
                None => (ProviderOutcome::NoData, None),
            },
            Ok(Err(ProviderError::Cancelled)) => (ProviderOutcome::Cancelled, None),
            Ok(Err(e)) => {
                tracing::warn!(fen = %pos.fen, error = %e, "Tablebase lookup failed");
                (ProviderOutcome::Failed, None)
            }
            Err(_) => {
                cancel.cancel();
                tracing::debug!(
                    fen = %pos.fen,
                    timeout_ms = self.config.tablebase_timeout_ms,
                    "Tablebase lookup timed out"
                );
                (ProviderOutcome::TimedOut, None)
            }
        };
        self.provider_call(ProviderKind::Tablebase, outcome, started);
        result
    }

    async fn fetch_engine(
        &self,
        pos: &Position,
        cancel: &CancellationToken,
    ) -> Result<NormalizedEvaluation, ServiceError> {
        let started = Instant::now();
        let search = self.engine.evaluate(&pos.fen, pos.side, cancel);
        tokio::pin!(search);
        let finished = tokio::select! {
            r = &mut search => Ok(r),
            _ = tokio::time::sleep(self.config.engine_timeout()) => {
                // Keep polling briefly so the provider sees the cancel and stops
                cancel.cancel();
                let _ = tokio::time::timeout(ENGINE_STOP_GRACE, &mut search).await;
                Err(())
            }
        };
        let (outcome, result) = match finished {
            Ok(Ok(Some(raw))) => (
                ProviderOutcome::Success,
                Ok(normalize_engine(Some(&raw), pos.side)),
            ),
            Ok(Ok(None)) => (ProviderOutcome::NoData, Err(ServiceError::NoData)),
            Ok(Err(ProviderError::Cancelled)) => {
                (ProviderOutcome::Cancelled, Err(ServiceError::Cancelled))
            }
            Ok(Err(e)) => {
                tracing::warn!(fen = %pos.fen, error = %e, "Engine evaluation failed");
                (ProviderOutcome::Failed, Err(e.into()))
            }
            Err(()) => {
                tracing::warn!(
                    fen = %pos.fen,
                    timeout_ms = self.config.engine_timeout_ms,
                    "Engine evaluation timed out"
                );
                (
                    ProviderOutcome::TimedOut,
                    Err(ServiceError::Timeout {
                        provider: ProviderKind::Engine,
                        ms: self.config.engine_timeout_ms,
                    }),
                )
            }
        };
        self.provider_call(ProviderKind::Engine, outcome, started);
        result
    }

    fn engine_disabled(&self) -> ServiceError {
        self.provider_call(ProviderKind::Engine, ProviderOutcome::Skipped, Instant::now());
        ServiceError::NoData
    }

    async fn compute(&self, pos: Position) -> Result<ProviderEvaluation, ServiceError> {
        if let Some(terminal) = pos.terminal_evaluation(self.config.tablebase_max_pieces) {
            tracing::debug!(fen = %pos.fen, "Terminal position, no provider needed");
            return Ok(ProviderEvaluation::single(terminal, pos.pieces));
        }

        let result = match self.config.strategy {
            Strategy::Sequential => self.sequential(&pos).await?,
            Strategy::Race => self.race(&pos).await?,
        };
        self.positions().set(pos.fen.clone(), result.clone());
        Ok(result)
    }

    async fn sequential(&self, pos: &Position) -> Result<ProviderEvaluation, ServiceError> {
        if let Some(tb) = self.fetch_tablebase(pos, &CancellationToken::new()).await {
            return Ok(ProviderEvaluation::single(tb, pos.pieces));
        }
        if !self.config.fallback_to_engine {
            return Err(self.engine_disabled());
        }

        self.emit(ServiceEvent::EngineFallback);
        let engine = self.fetch_engine(pos, &CancellationToken::new()).await?;
        Ok(ProviderEvaluation::single(engine, pos.pieces))
    }

    async fn race(&self, pos: &Position) -> Result<ProviderEvaluation, ServiceError> {
        let tb_token = CancellationToken::new();
        let engine_token = CancellationToken::new();

        let tb_fut = self.fetch_tablebase(pos, &tb_token);
        let engine_fut = async {
            if self.config.fallback_to_engine {
                self.fetch_engine(pos, &engine_token).await
            } else {
                Err(self.engine_disabled())
            }
        };
        tokio::pin!(tb_fut, engine_fut);

        let mut tb_done: Option<Option<NormalizedEvaluation>> = None;
        let mut engine_done: Option<Result<NormalizedEvaluation, ServiceError>> = None;
        let answered = |tb: &Option<Option<NormalizedEvaluation>>,
                        engine: &Option<Result<NormalizedEvaluation, ServiceError>>| {
            matches!(tb, Some(Some(_))) || matches!(engine, Some(Ok(_)))
        };

        let overall = tokio::time::sleep(
            self.config
                .engine_timeout()
                .max(self.config.tablebase_timeout()),
        );
        tokio::pin!(overall);

        loop {
            tokio::select! {
                r = &mut tb_fut, if tb_done.is_none() => tb_done = Some(r),
                r = &mut engine_fut, if engine_done.is_none() => engine_done = Some(r),
                _ = &mut overall => break,
            }
            if answered(&tb_done, &engine_done) || (tb_done.is_some() && engine_done.is_some()) {
                break;
            }
        }

        // Give the slower provider a short window to backfill
        if answered(&tb_done, &engine_done) && (tb_done.is_none() || engine_done.is_none()) {
            let window = tokio::time::sleep(self.config.backfill_window());
            tokio::pin!(window);
            loop {
                tokio::select! {
                    r = &mut tb_fut, if tb_done.is_none() => tb_done = Some(r),
                    r = &mut engine_fut, if engine_done.is_none() => engine_done = Some(r),
                    _ = &mut window => {
                        tracing::debug!(fen = %pos.fen, "Backfill window elapsed");
                        break;
                    }
                }
                if tb_done.is_some() && engine_done.is_some() {
                    break;
                }
            }
        }

        // Late results are ignored from here on
        tb_token.cancel();
        engine_token.cancel();
        if engine_done.is_none() {
            let _ = tokio::time::timeout(ENGINE_STOP_GRACE, &mut engine_fut).await;
        }

        let tablebase = tb_done.flatten();
        let (engine, engine_error) = match engine_done {
            Some(Ok(e)) => (Some(e), None),
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };
        let Some(primary) = tablebase.clone().or_else(|| engine.clone()) else {
            return Err(engine_error.unwrap_or(ServiceError::Timeout {
                provider: ProviderKind::Engine,
                ms: self.config.engine_timeout_ms,
            }));
        };

        Ok(ProviderEvaluation {
            primary,
            engine,
            tablebase,
            piece_count: pos.pieces,
        })
    }
}

/// Entry point of the evaluation pipeline. Cheap to clone.
#[derive(Clone)]
pub struct EvaluationService {
    inner: Arc<Inner>,
}

impl EvaluationService {
    pub fn builder(engine: Arc<dyn EngineProvider>) -> EvaluationServiceBuilder {
        EvaluationServiceBuilder {
            config: ServiceConfig::default(),
            engine,
            tablebase: Arc::new(NoTablebase),
            cache: None,
            applier: Arc::new(StandardMoveApplier),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn new(
        config: ServiceConfig,
        engine: Arc<dyn EngineProvider>,
        tablebase: Arc<dyn TablebaseProvider>,
    ) -> Self {
        Self::builder(engine).config(config).tablebase(tablebase).build()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub async fn get_formatted_evaluation(&self, fen: &str, perspective: Side) -> FormattedEvaluation {
        self.get_formatted_evaluation_with_cancel(fen, perspective, &CancellationToken::new())
            .await
    }

    pub async fn get_perspective_evaluation(
        &self,
        fen: &str,
        perspective: Side,
    ) -> PerspectiveEvaluation {
        self.get_perspective_evaluation_with_cancel(fen, perspective, &CancellationToken::new())
            .await
    }

    pub async fn get_formatted_dual_evaluation(&self, fen: &str, perspective: Side) -> DualEvaluation {
        self.get_formatted_dual_evaluation_with_cancel(fen, perspective, &CancellationToken::new())
            .await
    }

    pub async fn assess_move_quality(&self, fen: &str, mv: &str, player: Side) -> MoveQualityResult {
        self.assess_move_quality_with_cancel(fen, mv, player, &CancellationToken::new())
            .await
    }

    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_formatted_evaluation_with_cancel(
        &self,
        fen: &str,
        perspective: Side,
        cancel: &CancellationToken,
    ) -> FormattedEvaluation {
        let started = Instant::now();
        let result = self.formatted(fen, perspective, cancel).await;
        self.completed(PayloadKind::Formatted, started, result.is_no_data());
        result
    }

    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_perspective_evaluation_with_cancel(
        &self,
        fen: &str,
        perspective: Side,
        cancel: &CancellationToken,
    ) -> PerspectiveEvaluation {
        let started = Instant::now();
        let result = self.perspective(fen, perspective, cancel).await;
        self.completed(PayloadKind::Perspective, started, !result.has_data());
        result
    }

    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_formatted_dual_evaluation_with_cancel(
        &self,
        fen: &str,
        perspective: Side,
        cancel: &CancellationToken,
    ) -> DualEvaluation {
        let started = Instant::now();
        let result = self.dual(fen, perspective, cancel).await;
        self.completed(PayloadKind::Dual, started, result.engine.is_no_data());
        result
    }

    /// Judge `mv` (UCI or SAN) played by `player` from `fen`.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn assess_move_quality_with_cancel(
        &self,
        fen: &str,
        mv: &str,
        player: Side,
        cancel: &CancellationToken,
    ) -> MoveQualityResult {
        let after_fen = match self.inner.applier.apply(fen, mv) {
            Ok(after) => after,
            Err(e) => {
                tracing::debug!(mv = %mv, error = %e, "Move could not be applied");
                return MoveQualityResult::invalid_move();
            }
        };

        let (before, after) = tokio::join!(
            self.perspective(fen, player, cancel),
            self.perspective(&after_fen, player, cancel),
        );
        let mut result = classify_move(&before, &after);
        result.position_after = Some(after_fen);
        tracing::debug!(quality = %result.quality, "Move assessed");
        result
    }

    /// Drop everything cached for `fen`, all payload kinds and perspectives.
    pub async fn invalidate(&self, fen: &str) {
        let key_fen = match Position::inspect(fen) {
            Ok(pos) => pos.fen,
            Err(_) => chess::normalize_fen(fen),
        };
        self.inner.positions().remove(&key_fen);

        let Some(cache) = self.inner.cache.as_ref() else {
            return;
        };
        for kind in PayloadKind::ALL {
            for side in [Side::White, Side::Black] {
                let key = cache_key(kind, side, &key_fen);
                if let Err(e) = cache.delete(&key).await {
                    tracing::warn!(key = %key, error = %e, "Cache delete failed");
                    self.inner.emit(ServiceEvent::CacheError);
                }
            }
        }
    }

    pub async fn clear_cache(&self) {
        self.inner.positions().clear();
        if let Some(cache) = self.inner.cache.as_ref() {
            if let Err(e) = cache.clear().await {
                tracing::warn!(error = %e, "Cache clear failed");
                self.inner.emit(ServiceEvent::CacheError);
            }
        }
        tracing::info!("Evaluation caches cleared");
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            pending: self.inner.dedup.pending_count(),
            active_keys: self.inner.dedup.active_keys(),
            position_cache_size: self.inner.positions().len(),
        }
    }

    /// Provider results for `fen`, White-relative. Joins any in-flight
    /// computation for the same position.
    pub async fn provider_evaluation(
        &self,
        fen: &str,
        cancel: &CancellationToken,
    ) -> Result<ProviderEvaluation, ServiceError> {
        self.evaluate_position(Position::inspect(fen)?, cancel).await
    }

    fn completed(&self, kind: PayloadKind, started: Instant, degraded: bool) {
        self.inner.emit(ServiceEvent::RequestCompleted {
            kind,
            latency: started.elapsed(),
            degraded,
        });
    }

    async fn evaluate_position(
        &self,
        pos: Position,
        cancel: &CancellationToken,
    ) -> Result<ProviderEvaluation, ServiceError> {
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        let cached = self.inner.positions().get(&pos.fen).cloned();
        if let Some(hit) = cached {
            self.inner.emit(ServiceEvent::PositionCacheHit);
            return Ok(hit);
        }

        let key = pos.fen.clone();
        let inner = Arc::clone(&self.inner);
        let joined = self
            .inner
            .dedup
            .start(&key, move || async move { inner.compute(pos).await });
        if joined.joined_existing {
            self.inner.emit(ServiceEvent::DedupJoined);
        }

        tokio::select! {
            result = joined.future => result,
            _ = cancel.cancelled() => {
                tracing::debug!(fen = %key, "Caller cancelled, leaving computation to other joiners");
                Err(ServiceError::Cancelled)
            }
        }
    }

    /// Ensure an engine result exists alongside a tablebase-only one.
    async fn with_engine(
        &self,
        pos: &Position,
        base: ProviderEvaluation,
        cancel: &CancellationToken,
    ) -> ProviderEvaluation {
        if base.engine.is_some() || !self.inner.config.fallback_to_engine {
            return base;
        }

        let inner = Arc::clone(&self.inner);
        let owned_pos = pos.clone();
        let merged_base = base.clone();
        let joined = self.inner.dedup.start(&format!("engine:{}", pos.fen), move || async move {
            let engine = inner.fetch_engine(&owned_pos, &CancellationToken::new()).await?;
            let merged = ProviderEvaluation {
                engine: Some(engine),
                ..merged_base
            };
            inner.positions().set(owned_pos.fen.clone(), merged.clone());
            Ok(merged)
        });

        let result = tokio::select! {
            result = joined.future => result,
            _ = cancel.cancelled() => Err(ServiceError::Cancelled),
        };
        match result {
            Ok(merged) => merged,
            Err(e) => {
                tracing::debug!(fen = %pos.fen, error = %e, "No engine result for dual view");
                base
            }
        }
    }

    async fn formatted(
        &self,
        fen: &str,
        perspective: Side,
        cancel: &CancellationToken,
    ) -> FormattedEvaluation {
        let pos = match Position::inspect(fen) {
            Ok(pos) => pos,
            Err(e) => {
                tracing::warn!(fen = %fen, error = %e, "Rejecting position");
                return FormattedEvaluation::no_data();
            }
        };
        let key = cache_key(PayloadKind::Formatted, perspective, &pos.fen);
        if let Some(CachedPayload::Formatted(hit)) =
            self.inner.cache_get(&key, PayloadKind::Formatted).await
        {
            return hit;
        }

        match self.evaluate_position(pos, cancel).await {
            Ok(pe) => {
                let formatted = self.inner.format(&pe.primary, perspective);
                self.inner
                    .cache_set(&key, CachedPayload::Formatted(formatted.clone()))
                    .await;
                formatted
            }
            Err(e) => {
                log_degraded(&e);
                FormattedEvaluation::no_data()
            }
        }
    }

    async fn perspective(
        &self,
        fen: &str,
        perspective: Side,
        cancel: &CancellationToken,
    ) -> PerspectiveEvaluation {
        let pos = match Position::inspect(fen) {
            Ok(pos) => pos,
            Err(e) => {
                tracing::warn!(fen = %fen, error = %e, "Rejecting position");
                return PerspectiveEvaluation::empty(perspective);
            }
        };
        let key = cache_key(PayloadKind::Perspective, perspective, &pos.fen);
        if let Some(CachedPayload::Perspective(hit)) =
            self.inner.cache_get(&key, PayloadKind::Perspective).await
        {
            return hit;
        }

        match self.evaluate_position(pos, cancel).await {
            Ok(pe) => {
                let view = to_perspective(Some(&pe.primary), perspective);
                self.inner
                    .cache_set(&key, CachedPayload::Perspective(view.clone()))
                    .await;
                view
            }
            Err(e) => {
                log_degraded(&e);
                PerspectiveEvaluation::empty(perspective)
            }
        }
    }

    async fn dual(&self, fen: &str, perspective: Side, cancel: &CancellationToken) -> DualEvaluation {
        let unavailable = DualEvaluation {
            engine: FormattedEvaluation::no_data(),
            tablebase: None,
        };
        let pos = match Position::inspect(fen) {
            Ok(pos) => pos,
            Err(e) => {
                tracing::warn!(fen = %fen, error = %e, "Rejecting position");
                return unavailable;
            }
        };
        let key = cache_key(PayloadKind::Dual, perspective, &pos.fen);
        if let Some(CachedPayload::Dual(hit)) = self.inner.cache_get(&key, PayloadKind::Dual).await {
            return hit;
        }

        let pe = match self.evaluate_position(pos.clone(), cancel).await {
            Ok(pe) => self.with_engine(&pos, pe, cancel).await,
            Err(e) => {
                log_degraded(&e);
                return unavailable;
            }
        };

        let dual = DualEvaluation {
            engine: pe
                .engine
                .as_ref()
                .map(|e| self.inner.format(e, perspective))
                .unwrap_or_else(FormattedEvaluation::no_data),
            tablebase: pe
                .tablebase
                .as_ref()
                .map(|tb| self.inner.format(tb, perspective)),
        };
        if !cancel.is_cancelled() {
            self.inner.cache_set(&key, CachedPayload::Dual(dual.clone())).await;
        }
        dual
    }
}

fn log_degraded(error: &ServiceError) {
    match error {
        ServiceError::Cancelled => tracing::debug!("Request cancelled, returning no data"),
        e => tracing::warn!(error = %e, "Evaluation unavailable, returning no data"),
    }
}
