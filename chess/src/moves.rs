//! Applying a move given in either coordinate or algebraic notation.

use cozy_chess::Move;

use crate::fen::{format_fen, parse_fen, FenError};
use crate::san::parse_san;
use crate::uci::{convert_uci_castling_to_cozy, looks_like_uci, parse_uci_move};

/// Resolve `notation` (UCI such as `e2e4`/`e1g1`, or SAN such as `Nf3`/`O-O`)
/// to a legal move of the position.
pub fn resolve_move(fen: &str, notation: &str) -> Result<Move, MoveError> {
    let board = parse_fen(fen)?;

    if looks_like_uci(notation) {
        let mv = convert_uci_castling_to_cozy(&board, parse_uci_move(notation)?);
        if board.is_legal(mv) {
            return Ok(mv);
        }
        // "b1c3"-shaped strings are never valid SAN, so nothing to fall back to
        return Err(MoveError::Illegal(notation.to_string()));
    }

    parse_san(&board, notation)
}

/// Play `notation` on `fen` and return the resulting FEN.
pub fn apply_move(fen: &str, notation: &str) -> Result<String, MoveError> {
    let mut board = parse_fen(fen)?;
    let mv = resolve_move(fen, notation)?;
    board.play_unchecked(mv);
    Ok(format_fen(&board))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Invalid position: {0}")]
    InvalidPosition(#[from] FenError),
    #[error("Invalid move notation: {0}")]
    InvalidNotation(String),
    #[error("Illegal move: {0}")]
    Illegal(String),
    #[error("Ambiguous move: {0}")]
    Ambiguous(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_apply_uci() {
        let after = apply_move(START_FEN, "e2e4").unwrap();
        assert!(after.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq"));
    }

    #[test]
    fn test_apply_san() {
        assert_eq!(
            apply_move(START_FEN, "Nf3").unwrap(),
            "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1"
        );
    }

    #[test]
    fn test_apply_uci_castling() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let after = apply_move(fen, "e1g1").unwrap();
        assert!(after.starts_with("r3k2r/8/8/8/8/8/8/R4RK1 b kq"));
    }

    #[test]
    fn test_illegal_move_rejected() {
        assert_eq!(
            apply_move(START_FEN, "e2e5"),
            Err(MoveError::Illegal("e2e5".to_string()))
        );
        assert!(matches!(
            apply_move(START_FEN, "Qh5"),
            Err(MoveError::Illegal(_))
        ));
    }

    #[test]
    fn test_invalid_position_rejected() {
        assert!(matches!(
            apply_move("garbage", "e2e4"),
            Err(MoveError::InvalidPosition(_))
        ));
    }
}
