//! Canonical (White-relative) evaluation → a chosen player's point of view.
//!
//! The canonical form is inverted exactly once for Black. Values are never
//! taken from an already-transformed evaluation.

use chess::Side;
use serde::{Deserialize, Serialize};

use crate::normalize::{negate, EvaluationSource, NormalizedEvaluation};

/// An evaluation seen from `perspective`: positive values favour that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerspectiveEvaluation {
    pub perspective: Side,
    pub source: Option<EvaluationSource>,
    pub is_tablebase_position: bool,
    pub score_cp: Option<i32>,
    pub mate: Option<i32>,
    pub wdl: Option<i32>,
    pub dtm: Option<i32>,
    pub dtz: Option<i32>,
    pub depth: Option<u32>,
}

impl PerspectiveEvaluation {
    /// No data at all.
    pub fn empty(perspective: Side) -> Self {
        Self {
            perspective,
            source: None,
            is_tablebase_position: false,
            score_cp: None,
            mate: None,
            wdl: None,
            dtm: None,
            dtz: None,
            depth: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.score_cp.is_some() || self.mate.is_some() || self.wdl.is_some()
    }

    pub fn is_tablebase(&self) -> bool {
        self.source == Some(EvaluationSource::Tablebase)
    }

    pub fn is_engine(&self) -> bool {
        self.source == Some(EvaluationSource::Engine)
    }
}

/// Express `normalized` from `perspective`. A missing evaluation yields an
/// empty result defaulted to White.
pub fn to_perspective(
    normalized: Option<&NormalizedEvaluation>,
    perspective: Side,
) -> PerspectiveEvaluation {
    let Some(n) = normalized else {
        return PerspectiveEvaluation::empty(Side::White);
    };

    let view = |v: Option<i32>| match perspective {
        Side::White => v,
        Side::Black => v.map(negate),
    };

    PerspectiveEvaluation {
        perspective,
        source: Some(n.source),
        is_tablebase_position: n.is_tablebase_position,
        score_cp: view(n.score_cp),
        mate: view(n.mate),
        wdl: view(n.wdl),
        dtm: view(n.dtm),
        dtz: view(n.dtz),
        depth: n.depth,
    }
}

/// Same as [`to_perspective`] but with an unvalidated perspective code;
/// anything other than `"w"`/`"b"` is treated as White.
pub fn to_perspective_code(
    normalized: Option<&NormalizedEvaluation>,
    perspective: &str,
) -> PerspectiveEvaluation {
    to_perspective(normalized, Side::from_code_or_white(perspective))
}
