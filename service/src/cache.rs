//! Result cache used by the orchestrator for finished payloads.
//!
//! Distinct from the [`PriorityCache`](crate::priority_cache::PriorityCache),
//! which holds White-relative provider results per position.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chess::Side;
use evaluation::{FormattedEvaluation, PerspectiveEvaluation};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::CacheError;
use crate::orchestrator::DualEvaluation;

/// Shape of a cached payload. Part of the key so shapes never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Formatted,
    Perspective,
    Dual,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 3] = [Self::Formatted, Self::Perspective, Self::Dual];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Formatted => "formatted",
            Self::Perspective => "perspective",
            Self::Dual => "dual",
        }
    }
}

/// `eval:{kind}:{perspective}:{fen}`
pub fn cache_key(kind: PayloadKind, perspective: Side, fen: &str) -> String {
    format!("eval:{}:{}:{}", kind.as_str(), perspective.code(), fen)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedPayload {
    Formatted(FormattedEvaluation),
    Perspective(PerspectiveEvaluation),
    Dual(DualEvaluation),
}

impl CachedPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Formatted(_) => PayloadKind::Formatted,
            Self::Perspective(_) => PayloadKind::Perspective,
            Self::Dual(_) => PayloadKind::Dual,
        }
    }
}

/// Asynchronous key/value store with per-entry TTL.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedPayload>, CacheError>;
    async fn set(&self, key: &str, value: CachedPayload, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Minimum time between sweeps of expired entries on write.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Store {
    entries: HashMap<String, (Instant, CachedPayload)>,
    next_sweep: Option<Instant>,
}

/// In-process TTL store. Expired entries are dropped on read, and swept in
/// bulk on write at most once per [`SWEEP_INTERVAL`].
#[derive(Debug, Default)]
pub struct MemoryCacheProvider {
    store: Mutex<Store>,
}

impl MemoryCacheProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.store()
            .entries
            .values()
            .filter(|(expires, _)| *expires > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries held, expired or not.
    #[cfg(test)]
    fn stored(&self) -> usize {
        self.store().entries.len()
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> Result<Option<CachedPayload>, CacheError> {
        let mut store = self.store();
        match store.entries.get(key) {
            Some((expires, value)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                store.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: CachedPayload, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut store = self.store();
        let next_sweep = store.next_sweep;
        match next_sweep {
            Some(due) if now >= due => {
                let before = store.entries.len();
                store.entries.retain(|_, (expires, _)| *expires > now);
                tracing::trace!(
                    swept = before - store.entries.len(),
                    "Swept expired cache entries"
                );
                store.next_sweep = Some(now + SWEEP_INTERVAL);
            }
            Some(_) => {}
            None => store.next_sweep = Some(now + SWEEP_INTERVAL),
        }
        store.entries.insert(key.to_string(), (now + ttl, value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store().entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.store().entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEN: &str = "8/8/8/8/8/8/8/K6k w - - 0 1";

    #[test]
    fn test_key_includes_kind_and_perspective() {
        assert_eq!(
            cache_key(PayloadKind::Formatted, Side::Black, FEN),
            format!("eval:formatted:b:{}", FEN)
        );
        assert_ne!(
            cache_key(PayloadKind::Formatted, Side::White, FEN),
            cache_key(PayloadKind::Perspective, Side::White, FEN)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = MemoryCacheProvider::new();
        let payload = CachedPayload::Formatted(FormattedEvaluation::no_data());
        cache.set("k", payload.clone(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(payload));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_swept_on_write() {
        let cache = MemoryCacheProvider::new();
        let payload = CachedPayload::Formatted(FormattedEvaluation::no_data());
        for i in 0..10_000 {
            cache
                .set(&format!("k{}", i), payload.clone(), Duration::from_secs(1))
                .await
                .unwrap();
        }
        assert_eq!(cache.stored(), 10_000);

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.set("fresh", payload, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.stored(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_live_entries() {
        let cache = MemoryCacheProvider::new();
        let payload = CachedPayload::Formatted(FormattedEvaluation::no_data());
        cache.set("short", payload.clone(), Duration::from_secs(1)).await.unwrap();
        cache.set("long", payload.clone(), Duration::from_secs(600)).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.set("new", payload.clone(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.stored(), 2);
        assert_eq!(cache.get("long").await.unwrap(), Some(payload));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = MemoryCacheProvider::new();
        let payload = CachedPayload::Perspective(PerspectiveEvaluation::empty(Side::White));
        cache.set("a", payload.clone(), Duration::from_secs(60)).await.unwrap();
        cache.set("b", payload, Duration::from_secs(60)).await.unwrap();
        cache.delete("a").await.unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear().await.unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let payload = CachedPayload::Formatted(FormattedEvaluation::no_data());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "formatted");
        assert_eq!(json["value"]["main_text"], "…");
        assert_eq!(payload.kind(), PayloadKind::Formatted);
    }
}
