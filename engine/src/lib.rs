pub mod provider;
pub mod stockfish;
pub mod uci;

pub use provider::StockfishProvider;
pub use stockfish::{find_stockfish_path, Analysis, EngineConfig, EngineError, StockfishEngine};
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;
use evaluation::RawEngineEvaluation;

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetPosition { fen: String, moves: Vec<Move> },
    SetOption { name: String, value: Option<String> },
    Go(GoParams),
    Stop,
    Quit,
}

impl EngineCommand {
    /// The UCI line for this command, newline terminated.
    pub fn to_uci_line(&self) -> String {
        let mut line = match self {
            Self::Uci => "uci".to_string(),
            Self::IsReady => "isready".to_string(),
            Self::SetPosition { fen, moves } => {
                let mut cmd = format!("position fen {}", fen);
                if !moves.is_empty() {
                    cmd.push_str(" moves");
                    for mv in moves {
                        cmd.push(' ');
                        cmd.push_str(&chess::format_uci_move(*mv));
                    }
                }
                cmd
            }
            Self::SetOption { name, value } => match value {
                Some(val) => format!("setoption name {} value {}", name, val),
                None => format!("setoption name {}", name),
            },
            Self::Go(params) => params.to_uci(),
            Self::Stop => "stop".to_string(),
            Self::Quit => "quit".to_string(),
        };
        line.push('\n');
        line
    }
}

/// Parameters for the "go" command. Searches are always time-bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoParams {
    pub movetime_ms: u64,
}

impl Default for GoParams {
    fn default() -> Self {
        Self { movetime_ms: 1000 }
    }
}

impl GoParams {
    pub fn movetime(ms: u64) -> Self {
        Self { movetime_ms: ms }
    }

    fn to_uci(self) -> String {
        format!("go movetime {}", self.movetime_ms)
    }
}

/// Events received from the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    UciOk,
    ReadyOk,
    /// `None` for `bestmove (none)` (no legal moves).
    BestMove(Option<Move>),
    Info(EngineInfo),
}

/// Engine analysis information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub bound: Option<ScoreBound>,
    pub pv: Vec<Move>, // Principal variation
    pub multipv: Option<u32>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

impl EngineInfo {
    /// Exact scores only; bound scores come from an interrupted iteration.
    pub fn is_exact(&self) -> bool {
        self.score.is_some() && self.bound.is_none()
    }

    /// Side-to-move relative raw evaluation.
    pub fn to_raw(&self) -> RawEngineEvaluation {
        let (score_cp, mate) = match self.score {
            Some(Score::Centipawns(cp)) => (Some(cp), None),
            Some(Score::Mate(m)) => (None, Some(m)),
            None => (None, None),
        };
        RawEngineEvaluation {
            score_cp,
            mate,
            depth: self.depth,
            nodes: self.nodes,
            nps: self.nps,
            time_ms: self.time_ms,
            pv: self.pv.iter().map(|mv| chess::format_uci_move(*mv)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Negative for being mated
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    Lower,
    Upper,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_lines() {
        assert_eq!(EngineCommand::Uci.to_uci_line(), "uci\n");
        assert_eq!(
            EngineCommand::SetOption {
                name: "Threads".into(),
                value: Some("4".into())
            }
            .to_uci_line(),
            "setoption name Threads value 4\n"
        );
        assert_eq!(
            EngineCommand::Go(GoParams::movetime(250)).to_uci_line(),
            "go movetime 250\n"
        );
        assert_eq!(
            EngineCommand::Go(GoParams::default()).to_uci_line(),
            "go movetime 1000\n"
        );
    }

    #[test]
    fn test_position_with_moves() {
        let e2e4 = chess::parse_uci_move("e2e4").unwrap();
        let cmd = EngineCommand::SetPosition {
            fen: "startfen".into(),
            moves: vec![e2e4],
        };
        assert_eq!(cmd.to_uci_line(), "position fen startfen moves e2e4\n");
    }

    #[test]
    fn test_info_to_raw() {
        let info = EngineInfo {
            depth: Some(20),
            score: Some(Score::Mate(-3)),
            pv: vec![chess::parse_uci_move("e7e5").unwrap()],
            ..Default::default()
        };
        let raw = info.to_raw();
        assert_eq!(raw.mate, Some(-3));
        assert_eq!(raw.score_cp, None);
        assert_eq!(raw.depth, Some(20));
        assert_eq!(raw.pv, vec!["e7e5".to_string()]);
    }
}
