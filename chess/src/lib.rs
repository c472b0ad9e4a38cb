//! Board collaborator for the evaluation pipeline: FEN handling, side to
//! move, piece counts, and move application in UCI or SAN notation.

pub mod fen;
pub mod moves;
pub mod san;
pub mod types;
pub mod uci;

pub use fen::{
    format_fen, normalize_fen, parse_fen, piece_count, position_status, side_to_move, summarize,
    BoardSummary, FenError, PositionStatus,
};
pub use moves::{apply_move, resolve_move, MoveError};
pub use san::{format_san, parse_san};
pub use types::{Side, UnknownSide};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move, parse_uci_move};
