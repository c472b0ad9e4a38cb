//! Typed provider output, before normalization.
//!
//! Both shapes are relative to the side to move of the position they were
//! produced for; the side itself is supplied separately to the normalizer.

use serde::{Deserialize, Serialize};

/// Search-engine output for one position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEngineEvaluation {
    /// Centipawns, positive = side to move is better.
    pub score_cp: Option<i32>,
    /// Signed distance to mate; positive = side to move mates.
    pub mate: Option<i32>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time_ms: Option<u64>,
    /// Principal variation as UCI move strings.
    #[serde(default)]
    pub pv: Vec<String>,
}

impl RawEngineEvaluation {
    pub fn centipawns(cp: i32) -> Self {
        Self {
            score_cp: Some(cp),
            ..Default::default()
        }
    }

    pub fn mate_in(mate: i32) -> Self {
        Self {
            mate: Some(mate),
            ..Default::default()
        }
    }
}

/// Tablebase category label for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TablebaseCategory {
    Win,
    /// Win that the fifty-move rule turns into a draw.
    CursedWin,
    Draw,
    /// Loss that the fifty-move rule saves.
    BlessedLoss,
    Loss,
    /// DTZ rounding makes the result uncertain; probably a win.
    MaybeWin,
    MaybeLoss,
    Unknown,
}

impl TablebaseCategory {
    /// Five-point WDL for the side to move.
    pub fn wdl(self) -> i32 {
        match self {
            Self::Win => 2,
            Self::CursedWin | Self::MaybeWin => 1,
            Self::Draw | Self::Unknown => 0,
            Self::BlessedLoss | Self::MaybeLoss => -1,
            Self::Loss => -2,
        }
    }

    pub fn from_wdl(wdl: i32) -> Self {
        match wdl {
            w if w >= 2 => Self::Win,
            1 => Self::CursedWin,
            0 => Self::Draw,
            -1 => Self::BlessedLoss,
            _ => Self::Loss,
        }
    }
}

/// Exact endgame lookup for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTablebaseResult {
    /// -2..=2, relative to the side to move.
    pub wdl: i32,
    pub dtz: Option<i32>,
    pub dtm: Option<i32>,
    pub category: TablebaseCategory,
    /// Whether `dtz` is exact rather than rounded.
    pub precise: bool,
}

impl RawTablebaseResult {
    pub fn new(wdl: i32, dtz: Option<i32>, dtm: Option<i32>) -> Self {
        let wdl = wdl.clamp(-2, 2);
        Self {
            wdl,
            dtz,
            dtm,
            category: TablebaseCategory::from_wdl(wdl),
            precise: true,
        }
    }
}
