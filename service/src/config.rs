//! Configuration for the evaluation service.
//!
//! Every value has a compile-time default and can be overridden at runtime
//! via a dedicated `EVAL_*` environment variable. Values that cannot be
//! parsed fall back to the default.

use std::str::FromStr;
use std::time::Duration;

use evaluation::{FormatterConfig, MateNotation};
use serde::{Deserialize, Serialize};

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_ENGINE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_TABLEBASE_TIMEOUT_MS: u64 = 2000;
const DEFAULT_NEUTRAL_THRESHOLD: i32 = 50;
const DEFAULT_EXTREME_SCORE_THRESHOLD: i32 = 1000;
const DEFAULT_BACKFILL_WINDOW_MS: u64 = 150;
/// Largest position the tablebase is asked about.
const DEFAULT_TABLEBASE_MAX_PIECES: u32 = 7;
const DEFAULT_POSITION_CACHE_SIZE: usize = 1000;

/// How the tablebase and the engine are coordinated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Tablebase first, engine only if the tablebase has no answer.
    #[default]
    Sequential,
    /// Both at once; first answer wins, the other may backfill briefly.
    Race,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "race" | "parallel" => Ok(Self::Race),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub enable_caching: bool,
    pub cache_ttl_seconds: u64,
    pub engine_timeout_ms: u64,
    pub tablebase_timeout_ms: u64,
    pub fallback_to_engine: bool,
    pub neutral_threshold: i32,
    pub extreme_score_threshold: i32,
    pub strategy: Strategy,
    pub backfill_window_ms: u64,
    pub tablebase_max_pieces: u32,
    pub position_cache_size: usize,
    pub mate_notation: MateNotation,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            engine_timeout_ms: DEFAULT_ENGINE_TIMEOUT_MS,
            tablebase_timeout_ms: DEFAULT_TABLEBASE_TIMEOUT_MS,
            fallback_to_engine: true,
            neutral_threshold: DEFAULT_NEUTRAL_THRESHOLD,
            extreme_score_threshold: DEFAULT_EXTREME_SCORE_THRESHOLD,
            strategy: Strategy::Sequential,
            backfill_window_ms: DEFAULT_BACKFILL_WINDOW_MS,
            tablebase_max_pieces: DEFAULT_TABLEBASE_MAX_PIECES,
            position_cache_size: DEFAULT_POSITION_CACHE_SIZE,
            mate_notation: MateNotation::Prefixed,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `EVAL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `EVAL_*` variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let get = |name: &str| lookup(name);

        Self {
            enable_caching: parse_or(get("EVAL_ENABLE_CACHING"), d.enable_caching),
            cache_ttl_seconds: parse_or(get("EVAL_CACHE_TTL_SECONDS"), d.cache_ttl_seconds),
            engine_timeout_ms: parse_or(get("EVAL_ENGINE_TIMEOUT_MS"), d.engine_timeout_ms),
            tablebase_timeout_ms: parse_or(get("EVAL_TABLEBASE_TIMEOUT_MS"), d.tablebase_timeout_ms),
            fallback_to_engine: parse_or(get("EVAL_FALLBACK_TO_ENGINE"), d.fallback_to_engine),
            neutral_threshold: parse_or(get("EVAL_NEUTRAL_THRESHOLD"), d.neutral_threshold),
            extreme_score_threshold: parse_or(
                get("EVAL_EXTREME_SCORE_THRESHOLD"),
                d.extreme_score_threshold,
            ),
            strategy: parse_or(get("EVAL_STRATEGY"), d.strategy),
            backfill_window_ms: parse_or(get("EVAL_BACKFILL_WINDOW_MS"), d.backfill_window_ms),
            tablebase_max_pieces: parse_or(get("EVAL_TABLEBASE_MAX_PIECES"), d.tablebase_max_pieces),
            position_cache_size: parse_or(get("EVAL_POSITION_CACHE_SIZE"), d.position_cache_size),
            mate_notation: parse_or(get("EVAL_MATE_NOTATION"), d.mate_notation),
        }
    }

    pub fn formatter_config(&self) -> FormatterConfig {
        FormatterConfig {
            neutral_threshold: self.neutral_threshold,
            extreme_score_threshold: self.extreme_score_threshold,
            mate_notation: self.mate_notation,
        }
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_timeout_ms)
    }

    pub fn tablebase_timeout(&self) -> Duration {
        Duration::from_millis(self.tablebase_timeout_ms)
    }

    pub fn backfill_window(&self) -> Duration {
        Duration::from_millis(self.backfill_window_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    match value {
        Some(v) => v.trim().parse().unwrap_or(default),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert!(config.enable_caching);
        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.engine_timeout_ms, 5000);
        assert_eq!(config.tablebase_timeout_ms, 2000);
        assert!(config.fallback_to_engine);
        assert_eq!(config.neutral_threshold, 50);
        assert_eq!(config.extreme_score_threshold, 1000);
        assert_eq!(config.strategy, Strategy::Sequential);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("EVAL_ENGINE_TIMEOUT_MS", "750"),
            ("EVAL_STRATEGY", "race"),
            ("EVAL_MATE_NOTATION", "hash"),
            ("EVAL_NEUTRAL_THRESHOLD", "twenty"),
            ("EVAL_ENABLE_CACHING", "false"),
        ]
        .into_iter()
        .collect();

        let config = ServiceConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.engine_timeout_ms, 750);
        assert_eq!(config.strategy, Strategy::Race);
        assert_eq!(config.mate_notation, MateNotation::Hash);
        assert_eq!(config.neutral_threshold, 50);
        assert!(!config.enable_caching);
        assert_eq!(config.tablebase_timeout_ms, 2000);
    }

    #[test]
    fn test_formatter_config_follows_thresholds() {
        let config = ServiceConfig {
            neutral_threshold: 20,
            ..Default::default()
        };
        assert_eq!(config.formatter_config().neutral_threshold, 20);
        assert_eq!(config.formatter_config().extreme_score_threshold, 1000);
    }
}
