//! Move-quality judgments from before/after evaluations.
//!
//! Both evaluations must be expressed from the perspective of the player
//! who made the move.

use serde::{Deserialize, Serialize};

use crate::perspective::PerspectiveEvaluation;

/// Quality of a played move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveQuality {
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
    /// Not enough comparable data, or the move could not be played.
    Unknown,
}

impl MoveQuality {
    /// Classify a signed centipawn change (positive = the player gained).
    pub fn from_cp_delta(delta: i64) -> Self {
        match delta {
            d if d >= 50 => Self::Excellent,
            d if d >= -10 => Self::Good,
            d if d >= -50 => Self::Inaccuracy,
            d if d >= -100 => Self::Mistake,
            _ => Self::Blunder,
        }
    }

    /// Annotation glyph for display.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Excellent => "!",
            Self::Good => "",
            Self::Inaccuracy => "?!",
            Self::Mistake => "?",
            Self::Blunder => "??",
            Self::Unknown => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const REASON_INVALID_MOVE: &str = "Invalid move";
pub const REASON_MIXED_SOURCES: &str = "Limited data: mixed evaluation sources";
pub const REASON_NO_DATA: &str = "Limited data: evaluation unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveQualityResult {
    pub quality: MoveQuality,
    /// Set for `Unknown` results.
    pub reason: Option<String>,
    /// Resulting position, when the move was legal.
    pub position_after: Option<String>,
    pub before: Option<PerspectiveEvaluation>,
    pub after: Option<PerspectiveEvaluation>,
    /// `after - before` of whichever metric decided the verdict.
    pub wdl_delta: Option<i32>,
    pub score_delta: Option<i64>,
}

impl MoveQualityResult {
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            quality: MoveQuality::Unknown,
            reason: Some(reason.into()),
            position_after: None,
            before: None,
            after: None,
            wdl_delta: None,
            score_delta: None,
        }
    }

    pub fn invalid_move() -> Self {
        Self::unknown(REASON_INVALID_MOVE)
    }
}

/// Compare two player-perspective evaluations of the positions before and
/// after a move.
pub fn classify_move(
    before: &PerspectiveEvaluation,
    after: &PerspectiveEvaluation,
) -> MoveQualityResult {
    let mut result = if before.is_tablebase_position && after.is_tablebase_position {
        classify_tablebase(before, after)
    } else if before.is_engine() && after.is_engine() {
        classify_engine(before, after)
    } else if before.has_data() && after.has_data() {
        MoveQualityResult::unknown(REASON_MIXED_SOURCES)
    } else {
        MoveQualityResult::unknown(REASON_NO_DATA)
    };
    result.before = Some(before.clone());
    result.after = Some(after.clone());
    result
}

fn verdict(quality: MoveQuality) -> MoveQualityResult {
    MoveQualityResult {
        quality,
        reason: None,
        ..MoveQualityResult::unknown("")
    }
}

fn classify_tablebase(
    before: &PerspectiveEvaluation,
    after: &PerspectiveEvaluation,
) -> MoveQualityResult {
    let (Some(wdl_before), Some(wdl_after)) = (before.wdl, after.wdl) else {
        return MoveQualityResult::unknown(REASON_NO_DATA);
    };
    let delta = wdl_after - wdl_before;

    let quality = match delta {
        d if d > 0 => MoveQuality::Excellent,
        0 if wdl_after > 0 => match (before.dtz, after.dtz) {
            (Some(b), Some(a)) => {
                let dtz_delta = i64::from(a.unsigned_abs()) - i64::from(b.unsigned_abs());
                if dtz_delta <= 0 {
                    MoveQuality::Excellent
                } else if dtz_delta <= 5 {
                    MoveQuality::Good
                } else {
                    MoveQuality::Inaccuracy
                }
            }
            _ => MoveQuality::Good,
        },
        0 => MoveQuality::Good,
        -1 => MoveQuality::Mistake,
        _ => MoveQuality::Blunder,
    };

    MoveQualityResult {
        wdl_delta: Some(delta),
        ..verdict(quality)
    }
}

fn classify_engine(
    before: &PerspectiveEvaluation,
    after: &PerspectiveEvaluation,
) -> MoveQualityResult {
    if before.mate.is_some() || after.mate.is_some() {
        return verdict(classify_mate(before.mate, after.mate));
    }

    let (Some(b), Some(a)) = (before.score_cp, after.score_cp) else {
        return MoveQualityResult::unknown(REASON_NO_DATA);
    };
    let delta = i64::from(a) - i64::from(b);
    MoveQualityResult {
        score_delta: Some(delta),
        ..verdict(MoveQuality::from_cp_delta(delta))
    }
}

fn classify_mate(before: Option<i32>, after: Option<i32>) -> MoveQuality {
    match (before, after) {
        // Player had a forced mate
        (Some(b), after) if b > 0 => match after {
            Some(a) if a >= 0 && a <= b => MoveQuality::Excellent,
            Some(a) if a > 0 => MoveQuality::Mistake,
            _ => MoveQuality::Blunder,
        },
        // Player was being mated
        (Some(b), after) if b < 0 => match after {
            None => MoveQuality::Excellent,
            Some(a) if a >= 0 => MoveQuality::Excellent,
            Some(a) if a.unsigned_abs() >= b.unsigned_abs() => MoveQuality::Good,
            Some(_) => MoveQuality::Inaccuracy,
        },
        (_, Some(a)) if a >= 0 => MoveQuality::Excellent,
        (_, Some(_)) => MoveQuality::Blunder,
        _ => MoveQuality::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::EvaluationSource;
    use chess::Side;

    fn tb(wdl: i32, dtz: Option<i32>) -> PerspectiveEvaluation {
        PerspectiveEvaluation {
            source: Some(EvaluationSource::Tablebase),
            is_tablebase_position: true,
            wdl: Some(wdl),
            dtz,
            ..PerspectiveEvaluation::empty(Side::White)
        }
    }

    fn cp(score: i32) -> PerspectiveEvaluation {
        PerspectiveEvaluation {
            source: Some(EvaluationSource::Engine),
            score_cp: Some(score),
            ..PerspectiveEvaluation::empty(Side::White)
        }
    }

    fn mate(m: i32) -> PerspectiveEvaluation {
        PerspectiveEvaluation {
            source: Some(EvaluationSource::Engine),
            mate: Some(m),
            ..PerspectiveEvaluation::empty(Side::White)
        }
    }

    fn quality(before: &PerspectiveEvaluation, after: &PerspectiveEvaluation) -> MoveQuality {
        classify_move(before, after).quality
    }

    #[test]
    fn test_tablebase_still_winning_dtz_equal_or_better() {
        assert_eq!(quality(&tb(2, Some(10)), &tb(2, Some(10))), MoveQuality::Excellent);
        assert_eq!(quality(&tb(2, Some(10)), &tb(2, Some(7))), MoveQuality::Excellent);
    }

    #[test]
    fn test_tablebase_dtz_drift() {
        assert_eq!(quality(&tb(2, Some(10)), &tb(2, Some(14))), MoveQuality::Good);
        assert_eq!(quality(&tb(2, Some(10)), &tb(2, Some(30))), MoveQuality::Inaccuracy);
        assert_eq!(quality(&tb(2, None), &tb(2, Some(30))), MoveQuality::Good);
    }

    #[test]
    fn test_tablebase_wdl_drops() {
        let r = classify_move(&tb(2, Some(4)), &tb(1, Some(4)));
        assert_eq!(r.quality, MoveQuality::Mistake);
        assert_eq!(r.wdl_delta, Some(-1));
        assert_eq!(quality(&tb(2, Some(4)), &tb(-2, Some(4))), MoveQuality::Blunder);
        assert_eq!(quality(&tb(0, None), &tb(-2, None)), MoveQuality::Blunder);
    }

    #[test]
    fn test_tablebase_improvement_and_held_draw() {
        assert_eq!(quality(&tb(-2, None), &tb(0, None)), MoveQuality::Excellent);
        assert_eq!(quality(&tb(0, Some(3)), &tb(0, Some(40))), MoveQuality::Good);
    }

    #[test]
    fn test_centipawn_bands() {
        assert_eq!(quality(&cp(0), &cp(60)), MoveQuality::Excellent);
        assert_eq!(quality(&cp(0), &cp(20)), MoveQuality::Good);
        assert_eq!(quality(&cp(0), &cp(-10)), MoveQuality::Good);
        assert_eq!(quality(&cp(0), &cp(-40)), MoveQuality::Inaccuracy);
        assert_eq!(quality(&cp(0), &cp(-90)), MoveQuality::Mistake);
        assert_eq!(quality(&cp(0), &cp(-350)), MoveQuality::Blunder);
        assert_eq!(classify_move(&cp(30), &cp(-70)).score_delta, Some(-100));
    }

    #[test]
    fn test_mate_found_kept_lost() {
        assert_eq!(quality(&cp(300), &mate(4)), MoveQuality::Excellent);
        assert_eq!(quality(&mate(3), &mate(2)), MoveQuality::Excellent);
        assert_eq!(quality(&mate(1), &mate(0)), MoveQuality::Excellent);
        assert_eq!(quality(&mate(2), &mate(5)), MoveQuality::Mistake);
        assert_eq!(quality(&mate(2), &cp(800)), MoveQuality::Blunder);
        assert_eq!(quality(&mate(2), &mate(-3)), MoveQuality::Blunder);
    }

    #[test]
    fn test_mate_against_player() {
        assert_eq!(quality(&cp(-50), &mate(-2)), MoveQuality::Blunder);
        assert_eq!(quality(&mate(-3), &mate(-3)), MoveQuality::Good);
        assert_eq!(quality(&mate(-3), &mate(-1)), MoveQuality::Inaccuracy);
        assert_eq!(quality(&mate(-3), &cp(-600)), MoveQuality::Excellent);
    }

    #[test]
    fn test_mixed_sources_are_limited() {
        let r = classify_move(&tb(2, Some(3)), &cp(500));
        assert_eq!(r.quality, MoveQuality::Unknown);
        assert_eq!(r.reason.as_deref(), Some(REASON_MIXED_SOURCES));
        assert!(r.before.is_some());
    }

    #[test]
    fn test_missing_data_is_unknown() {
        let r = classify_move(&PerspectiveEvaluation::empty(Side::White), &cp(10));
        assert_eq!(r.quality, MoveQuality::Unknown);
        assert_eq!(r.reason.as_deref(), Some(REASON_NO_DATA));
    }

    #[test]
    fn test_invalid_move_result() {
        let r = MoveQualityResult::invalid_move();
        assert_eq!(r.quality, MoveQuality::Unknown);
        assert_eq!(r.reason.as_deref(), Some("Invalid move"));
        assert_eq!(r.position_after, None);
    }
}
