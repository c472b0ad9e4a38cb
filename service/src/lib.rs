//! Evaluation orchestration: provider selection, caching, request
//! coalescing and the public evaluation entry points.

pub mod applier;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod priority_cache;

#[cfg(test)]
mod mock;

pub use applier::{MoveApplier, StandardMoveApplier};
pub use cache::{cache_key, CacheProvider, CachedPayload, MemoryCacheProvider, PayloadKind};
pub use config::{ServiceConfig, Strategy};
pub use dedup::Deduplicator;
pub use error::{CacheError, ServiceError};
pub use observer::{
    EvaluationObserver, MetricsObserver, MetricsSnapshot, NoopObserver, ProviderKind,
    ProviderOutcome, ServiceEvent,
};
pub use orchestrator::{
    DualEvaluation, EvaluationService, EvaluationServiceBuilder, ProviderEvaluation, ServiceStats,
};
pub use priority_cache::{Prioritized, PriorityCache};
