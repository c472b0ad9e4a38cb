//! Injectable event sink for the orchestrator. One observer per service
//! instance; nothing here is global.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::PayloadKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Engine,
    Tablebase,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine => write!(f, "engine"),
            Self::Tablebase => write!(f, "tablebase"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOutcome {
    Success,
    /// Answered, but without a usable evaluation.
    NoData,
    Failed,
    TimedOut,
    Cancelled,
    /// Not consulted (too many pieces, fallback disabled).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    CacheHit { kind: PayloadKind },
    CacheMiss { kind: PayloadKind },
    CacheError,
    PositionCacheHit,
    DedupJoined,
    ProviderCall {
        provider: ProviderKind,
        outcome: ProviderOutcome,
        latency: Duration,
    },
    EngineFallback,
    RequestCompleted {
        kind: PayloadKind,
        latency: Duration,
        /// The caller got the "no data" result.
        degraded: bool,
    },
}

pub trait EvaluationObserver: Send + Sync {
    fn on_event(&self, event: &ServiceEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EvaluationObserver for NoopObserver {
    fn on_event(&self, _event: &ServiceEvent) {}
}

/// Counting observer.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    position_cache_hits: AtomicU64,
    dedup_joins: AtomicU64,
    engine_calls: AtomicU64,
    engine_failures: AtomicU64,
    tablebase_calls: AtomicU64,
    tablebase_hits: AtomicU64,
    tablebase_failures: AtomicU64,
    fallbacks: AtomicU64,
    requests: AtomicU64,
    degraded: AtomicU64,
    total_latency_us: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub position_cache_hits: u64,
    pub dedup_joins: u64,
    pub engine_calls: u64,
    pub engine_failures: u64,
    pub tablebase_calls: u64,
    pub tablebase_hits: u64,
    pub tablebase_failures: u64,
    pub fallbacks: u64,
    pub requests: u64,
    pub degraded: u64,
    pub avg_latency_us: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let requests = get(&self.requests);
        MetricsSnapshot {
            cache_hits: get(&self.cache_hits),
            cache_misses: get(&self.cache_misses),
            cache_errors: get(&self.cache_errors),
            position_cache_hits: get(&self.position_cache_hits),
            dedup_joins: get(&self.dedup_joins),
            engine_calls: get(&self.engine_calls),
            engine_failures: get(&self.engine_failures),
            tablebase_calls: get(&self.tablebase_calls),
            tablebase_hits: get(&self.tablebase_hits),
            tablebase_failures: get(&self.tablebase_failures),
            fallbacks: get(&self.fallbacks),
            requests,
            degraded: get(&self.degraded),
            avg_latency_us: get(&self.total_latency_us).checked_div(requests).unwrap_or(0),
        }
    }
}

impl EvaluationObserver for MetricsObserver {
    fn on_event(&self, event: &ServiceEvent) {
        match event {
            ServiceEvent::CacheHit { .. } => bump(&self.cache_hits),
            ServiceEvent::CacheMiss { .. } => bump(&self.cache_misses),
            ServiceEvent::CacheError => bump(&self.cache_errors),
            ServiceEvent::PositionCacheHit => bump(&self.position_cache_hits),
            ServiceEvent::DedupJoined => bump(&self.dedup_joins),
            ServiceEvent::EngineFallback => bump(&self.fallbacks),
            ServiceEvent::ProviderCall {
                provider, outcome, ..
            } => {
                if *outcome == ProviderOutcome::Skipped {
                    return;
                }
                let failed = matches!(outcome, ProviderOutcome::Failed | ProviderOutcome::TimedOut);
                match provider {
                    ProviderKind::Engine => {
                        bump(&self.engine_calls);
                        if failed {
                            bump(&self.engine_failures);
                        }
                    }
                    ProviderKind::Tablebase => {
                        bump(&self.tablebase_calls);
                        if failed {
                            bump(&self.tablebase_failures);
                        }
                        if *outcome == ProviderOutcome::Success {
                            bump(&self.tablebase_hits);
                        }
                    }
                }
            }
            ServiceEvent::RequestCompleted {
                latency, degraded, ..
            } => {
                bump(&self.requests);
                if *degraded {
                    bump(&self.degraded);
                }
                let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
                self.total_latency_us.fetch_add(us, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counts_events() {
        let metrics = MetricsObserver::new();
        metrics.on_event(&ServiceEvent::CacheMiss {
            kind: PayloadKind::Formatted,
        });
        metrics.on_event(&ServiceEvent::ProviderCall {
            provider: ProviderKind::Tablebase,
            outcome: ProviderOutcome::TimedOut,
            latency: Duration::from_millis(50),
        });
        metrics.on_event(&ServiceEvent::ProviderCall {
            provider: ProviderKind::Tablebase,
            outcome: ProviderOutcome::Skipped,
            latency: Duration::ZERO,
        });
        metrics.on_event(&ServiceEvent::EngineFallback);
        metrics.on_event(&ServiceEvent::ProviderCall {
            provider: ProviderKind::Engine,
            outcome: ProviderOutcome::Success,
            latency: Duration::from_millis(300),
        });
        for ms in [100, 300] {
            metrics.on_event(&ServiceEvent::RequestCompleted {
                kind: PayloadKind::Formatted,
                latency: Duration::from_millis(ms),
                degraded: false,
            });
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.tablebase_calls, 1);
        assert_eq!(snap.tablebase_failures, 1);
        assert_eq!(snap.tablebase_hits, 0);
        assert_eq!(snap.engine_calls, 1);
        assert_eq!(snap.fallbacks, 1);
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.avg_latency_us, 200_000);
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(MetricsObserver::new().snapshot(), MetricsSnapshot::default());
    }
}
