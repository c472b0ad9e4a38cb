//! Runtime tunables for the engine side of `evalctl`.
//!
//! Every value has a compile-time default and can be overridden through an
//! environment variable. Command-line flags take precedence over both.
//! Orchestrator options are read separately by `ServiceConfig::from_env`.

use std::path::PathBuf;

/// Default search time per position (in milliseconds).
const DEFAULT_MOVETIME_MS: u64 = 1000;

/// Default engine thread count.
const DEFAULT_ENGINE_THREADS: u32 = 1;

/// Default engine hash table size (in MB).
const DEFAULT_ENGINE_HASH_MB: u32 = 64;

/// Get an explicit Stockfish binary path.
///
/// Priority:
/// 1. `EVALCTL_STOCKFISH_PATH` env variable if set
/// 2. `None`, meaning the binary is searched for in common locations
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var("EVALCTL_STOCKFISH_PATH").ok().map(PathBuf::from)
}

/// Get the search time per position in milliseconds.
///
/// Priority:
/// 1. `EVALCTL_MOVETIME_MS` env variable if set (falls back to the default
///    if the value cannot be parsed as a `u64`)
/// 2. `1000` ms as fallback
pub fn get_movetime_ms() -> u64 {
    if let Ok(ms) = std::env::var("EVALCTL_MOVETIME_MS") {
        return ms.parse().unwrap_or(DEFAULT_MOVETIME_MS);
    }

    DEFAULT_MOVETIME_MS
}

/// Get the engine thread count.
///
/// Priority:
/// 1. `EVALCTL_ENGINE_THREADS` env variable if set
/// 2. `1` as fallback
pub fn get_engine_threads() -> u32 {
    if let Ok(threads) = std::env::var("EVALCTL_ENGINE_THREADS") {
        return threads.parse().unwrap_or(DEFAULT_ENGINE_THREADS);
    }

    DEFAULT_ENGINE_THREADS
}

/// Get the engine hash size in MB.
pub fn get_engine_hash_mb() -> u32 {
    if let Ok(mb) = std::env::var("EVALCTL_ENGINE_HASH_MB") {
        return mb.parse().unwrap_or(DEFAULT_ENGINE_HASH_MB);
    }

    DEFAULT_ENGINE_HASH_MB
}
