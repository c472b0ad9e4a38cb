//! Bounded cache that prefers keeping endgame and critical positions.

use std::collections::HashMap;

/// Positions with at most this many pieces get the endgame bonus.
pub const ENDGAME_MAX_PIECES: u32 = 7;
/// Scores at least this large (centipawns, either sign) are critical.
pub const CRITICAL_SCORE_CP: i32 = 500;

const BASE_PRIORITY: u32 = 1;
const ENDGAME_BONUS: u32 = 2;
const CRITICAL_BONUS: u32 = 2;

/// What the cache needs to know about a value to prioritize it.
pub trait Prioritized {
    fn piece_count(&self) -> Option<u32>;
    /// Large score, forced mate, or tablebase hit.
    fn is_critical(&self) -> bool;
}

/// Priority of a new entry. Endgame and critical bonuses add up.
pub fn priority(piece_count: Option<u32>, is_critical: bool) -> u32 {
    let mut p = BASE_PRIORITY;
    if piece_count.is_some_and(|n| n <= ENDGAME_MAX_PIECES) {
        p += ENDGAME_BONUS;
    }
    if is_critical {
        p += CRITICAL_BONUS;
    }
    p
}

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    priority: u32,
    last_access: u64,
}

#[derive(Debug, Clone)]
pub struct PriorityCache<V> {
    entries: HashMap<String, Slot<V>>,
    max_size: usize,
    /// Logical clock for recency.
    tick: u64,
}

impl<V: Prioritized> PriorityCache<V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_size.min(4096)),
            max_size,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Look up `key`, marking it as recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let tick = self.next_tick();
        let slot = self.entries.get_mut(key)?;
        slot.last_access = tick;
        Some(&slot.value)
    }

    /// Presence check; does not touch recency.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn priority_of(&self, key: &str) -> Option<u32> {
        self.entries.get(key).map(|s| s.priority)
    }

    /// Insert or replace. Evicts one entry if the cache is full and `key` is
    /// new.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        if self.max_size == 0 {
            return;
        }
        let key = key.into();
        let priority = priority(value.piece_count(), value.is_critical());

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            if let Some(victim) = self.eviction_candidate(priority) {
                tracing::debug!(key = %victim, incoming = priority, "Evicting position");
                self.entries.remove(&victim);
            }
        }

        let tick = self.next_tick();
        self.entries.insert(
            key,
            Slot {
                value,
                priority,
                last_access: tick,
            },
        );
    }

    /// Least recently used entry with lower priority than `incoming`, else
    /// the least recently used entry overall.
    fn eviction_candidate(&self, incoming: u32) -> Option<String> {
        let lru = |lower_only: bool| {
            self.entries
                .iter()
                .filter(|(_, s)| !lower_only || s.priority < incoming)
                .min_by_key(|(_, s)| s.last_access)
                .map(|(k, _)| k.clone())
        };
        lru(true).or_else(|| lru(false))
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|s| s.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
