//! Display formatting for perspective evaluations.
//!
//! Priority order, first match wins: tablebase verdict, forced mate,
//! centipawn score, then the "no data" sentinel. Formatting is pure.

use serde::{Deserialize, Serialize};

use crate::perspective::PerspectiveEvaluation;

/// Main text used when nothing is known about the position.
pub const NO_DATA_TEXT: &str = "…";

/// Coarse judgment from the perspective player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Winning,
    Advantage,
    Neutral,
    Disadvantage,
    Losing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatMetadata {
    pub is_tablebase: bool,
    pub is_mate: bool,
    pub is_drawn: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedEvaluation {
    pub main_text: String,
    pub detail_text: Option<String>,
    pub classification: Classification,
    pub metadata: FormatMetadata,
}

impl FormattedEvaluation {
    /// The universal fallback surface.
    pub fn no_data() -> Self {
        Self {
            main_text: NO_DATA_TEXT.to_string(),
            detail_text: None,
            classification: Classification::Neutral,
            metadata: FormatMetadata::default(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.main_text == NO_DATA_TEXT
    }
}

/// How forced mates are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MateNotation {
    /// `M5`
    #[default]
    Prefixed,
    /// `#5`
    Hash,
}

impl std::str::FromStr for MateNotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefixed" | "m" => Ok(Self::Prefixed),
            "hash" | "#" => Ok(Self::Hash),
            other => Err(format!("unknown mate notation: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Scores with a smaller magnitude (centipawns) are shown as neutral.
    pub neutral_threshold: i32,
    /// Scores of at least this magnitude are shown as winning/losing.
    pub extreme_score_threshold: i32,
    pub mate_notation: MateNotation,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            neutral_threshold: 50,
            extreme_score_threshold: 1000,
            mate_notation: MateNotation::Prefixed,
        }
    }
}

/// Format an evaluation for display.
pub fn format_evaluation(
    eval: &PerspectiveEvaluation,
    config: &FormatterConfig,
) -> FormattedEvaluation {
    if eval.is_tablebase_position {
        if let Some(wdl) = eval.wdl {
            return format_tablebase(wdl, eval.dtm, eval.dtz);
        }
    }
    if let Some(mate) = eval.mate {
        return format_mate(mate, config.mate_notation);
    }
    if let Some(cp) = eval.score_cp {
        return format_score(cp, eval.depth, config);
    }
    FormattedEvaluation::no_data()
}

fn format_tablebase(wdl: i32, dtm: Option<i32>, dtz: Option<i32>) -> FormattedEvaluation {
    let (main, classification) = match wdl {
        w if w > 1 => ("TB Win", Classification::Winning),
        1 => ("TB Win*", Classification::Winning),
        0 => ("TB Draw", Classification::Neutral),
        -1 => ("TB Loss*", Classification::Losing),
        _ => ("TB Loss", Classification::Losing),
    };
    let is_drawn = wdl == 0;

    let nonzero_dtz = dtz.filter(|d| *d != 0).map(i32::unsigned_abs);
    let detail_text = if is_drawn {
        nonzero_dtz.map(|d| format!("DTZ: {}", d))
    } else {
        match dtm {
            Some(m) => Some(format!("DTM: {}", m.unsigned_abs())),
            None => nonzero_dtz.map(|d| format!("DTZ: {}", d)),
        }
    };

    FormattedEvaluation {
        main_text: main.to_string(),
        detail_text,
        classification,
        metadata: FormatMetadata {
            is_tablebase: true,
            is_mate: false,
            is_drawn,
        },
    }
}

fn format_mate(mate: i32, notation: MateNotation) -> FormattedEvaluation {
    let metadata = FormatMetadata {
        is_tablebase: false,
        is_mate: true,
        is_drawn: false,
    };

    if mate == 0 {
        return FormattedEvaluation {
            main_text: "#".to_string(),
            detail_text: Some("Checkmate".to_string()),
            classification: Classification::Winning,
            metadata,
        };
    }

    let distance = mate.unsigned_abs();
    let main_text = match notation {
        MateNotation::Prefixed => format!("M{}", distance),
        MateNotation::Hash => format!("#{}", distance),
    };
    let (detail, classification) = if mate > 0 {
        (format!("Mate in {}", distance), Classification::Winning)
    } else {
        (format!("Mated in {}", distance), Classification::Losing)
    };

    FormattedEvaluation {
        main_text,
        detail_text: Some(detail),
        classification,
        metadata,
    }
}

fn format_score(cp: i32, depth: Option<u32>, config: &FormatterConfig) -> FormattedEvaluation {
    let magnitude = cp.unsigned_abs();
    let classification = if magnitude < config.neutral_threshold.unsigned_abs() {
        Classification::Neutral
    } else if magnitude >= config.extreme_score_threshold.unsigned_abs() {
        if cp > 0 {
            Classification::Winning
        } else {
            Classification::Losing
        }
    } else if cp > 0 {
        Classification::Advantage
    } else {
        Classification::Disadvantage
    };

    FormattedEvaluation {
        main_text: pawns_text(cp),
        detail_text: depth.map(|d| format!("Depth {}", d)),
        classification,
        metadata: FormatMetadata::default(),
    }
}

/// Centipawns as pawns with one decimal, rounding half away from zero.
fn pawns_text(cp: i32) -> String {
    let tenths = (u64::from(cp.unsigned_abs()) + 5) / 10;
    let sign = if cp < 0 && tenths > 0 { "-" } else { "" };
    format!("{}{}.{}", sign, tenths / 10, tenths % 10)
}
