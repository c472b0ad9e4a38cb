//! In-flight request coalescing.
//!
//! At most one computation runs per key. Callers arriving while it runs join
//! it and observe the same `Result`, error included. The entry is removed
//! when the computation settles, so the next call starts a fresh one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use uuid::Uuid;

pub type SharedResult<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Pending<T, E> {
    id: Uuid,
    future: SharedResult<T, E>,
}

type PendingMap<T, E> = HashMap<String, Pending<T, E>>;

/// Handle returned by [`Deduplicator::start`].
pub struct Joined<T, E> {
    pub future: SharedResult<T, E>,
    /// True if an already running computation was joined.
    pub joined_existing: bool,
}

pub struct Deduplicator<T, E> {
    pending: Arc<Mutex<PendingMap<T, E>>>,
}

impl<T, E> Default for Deduplicator<T, E> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn lock<T, E>(map: &Mutex<PendingMap<T, E>>) -> MutexGuard<'_, PendingMap<T, E>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T, E> Deduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` for `key`, or join the computation already running.
    pub async fn evaluate<F, Fut>(&self, key: &str, compute: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.start(key, compute).future.await
    }

    /// Register or join the computation for `key` without awaiting it.
    ///
    /// A new computation is spawned onto the runtime, so it completes even
    /// if every caller stops waiting. Must be called within a Tokio runtime.
    pub fn start<F, Fut>(&self, key: &str, compute: F) -> Joined<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut pending = lock(&self.pending);

        if let Some(existing) = pending.get(key) {
            tracing::debug!(key = %key, "Joining in-flight computation");
            return Joined {
                future: existing.future.clone(),
                joined_existing: true,
            };
        }

        let id = Uuid::new_v4();
        let map = Arc::clone(&self.pending);
        let owned_key = key.to_string();
        let work = compute();

        let future = async move {
            let result = work.await;
            let mut pending = lock(&map);
            // A clear() may have dropped us and a newer run taken the slot
            if pending.get(&owned_key).is_some_and(|p| p.id == id) {
                pending.remove(&owned_key);
            }
            result
        }
        .boxed()
        .shared();

        pending.insert(
            key.to_string(),
            Pending {
                id,
                future: future.clone(),
            },
        );
        drop(pending);

        tracing::debug!(key = %key, "Started computation");
        tokio::spawn(future.clone());

        Joined {
            future,
            joined_existing: false,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.pending).contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.pending).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Forget all in-flight entries. Running computations are not cancelled;
    /// their callers still receive results.
    pub fn clear(&self) {
        lock(&self.pending).clear();
    }
}
