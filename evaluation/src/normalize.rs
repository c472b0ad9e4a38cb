//! Raw provider output → canonical, White-relative evaluation.

use chess::Side;
use serde::{Deserialize, Serialize};

use crate::raw::{RawEngineEvaluation, RawTablebaseResult};

/// Where an evaluation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSource {
    Engine,
    Tablebase,
}

/// Canonical evaluation. Every populated numeric field is signed so that
/// positive means White is better.
///
/// Engine evaluations populate `score_cp` or `mate`; tablebase evaluations
/// populate `wdl` and optionally `dtm`/`dtz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvaluation {
    pub source: EvaluationSource,
    pub score_cp: Option<i32>,
    pub mate: Option<i32>,
    pub wdl: Option<i32>,
    pub dtm: Option<i32>,
    pub dtz: Option<i32>,
    pub is_tablebase_position: bool,
    /// Search depth, engine evaluations only.
    pub depth: Option<u32>,
}

impl NormalizedEvaluation {
    pub fn is_tablebase(&self) -> bool {
        self.source == EvaluationSource::Tablebase
    }

    /// Mate on the board, a forced mate, a tablebase hit, or a score of at
    /// least `score_threshold` centipawns in either direction.
    pub fn is_critical(&self, score_threshold: i32) -> bool {
        self.is_tablebase_position
            || self.mate.is_some()
            || self
                .score_cp
                .is_some_and(|cp| cp.unsigned_abs() >= score_threshold.unsigned_abs())
    }
}

/// Flip the sign of a side-relative value. Zero (draw, mate on board) is a
/// fixed point; `i32::MIN` saturates instead of overflowing.
pub fn negate(value: i32) -> i32 {
    if value == 0 {
        0
    } else {
        value.saturating_neg()
    }
}

fn orient(value: i32, side_to_move: Side) -> i32 {
    match side_to_move {
        Side::White => value,
        Side::Black => negate(value),
    }
}

/// Normalize engine output computed for a position with `side_to_move` to
/// play. Missing input yields a level score with no mate.
pub fn normalize_engine(
    raw: Option<&RawEngineEvaluation>,
    side_to_move: Side,
) -> NormalizedEvaluation {
    let (score_cp, mate, depth) = match raw {
        None => (Some(0), None, None),
        // Mate dominates score
        Some(r) if r.mate.is_some() => (None, r.mate.map(|m| orient(m, side_to_move)), r.depth),
        Some(r) => (
            Some(orient(r.score_cp.unwrap_or(0), side_to_move)),
            None,
            r.depth,
        ),
    };

    NormalizedEvaluation {
        source: EvaluationSource::Engine,
        score_cp,
        mate,
        wdl: None,
        dtm: None,
        dtz: None,
        is_tablebase_position: false,
        depth,
    }
}

/// Normalize a tablebase lookup. Missing input yields a draw, still flagged
/// as a tablebase position.
pub fn normalize_tablebase(
    raw: Option<&RawTablebaseResult>,
    side_to_move: Side,
) -> NormalizedEvaluation {
    let (wdl, dtz, dtm) = match raw {
        None => (0, None, None),
        Some(r) => (
            orient(r.wdl.clamp(-2, 2), side_to_move),
            r.dtz.map(|v| orient(v, side_to_move)),
            r.dtm.map(|v| orient(v, side_to_move)),
        ),
    };

    NormalizedEvaluation {
        source: EvaluationSource::Tablebase,
        score_cp: None,
        mate: None,
        wdl: Some(wdl),
        dtm,
        dtz,
        is_tablebase_position: true,
        depth: None,
    }
}
