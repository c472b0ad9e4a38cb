use cozy_chess::{Board, GameStatus};

use crate::types::Side;

/// Parse a FEN string into a Board.
///
/// Four-field FENs (no move counters) are accepted and completed with `0 1`.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    let full = match parts.len() {
        0 => return Err(FenError::InvalidFormat),
        4 => format!("{} 0 1", parts.join(" ")),
        6 => parts.join(" "),
        _ => return Err(FenError::InvalidFormat),
    };

    full.parse().map_err(|_| FenError::InvalidBoardLayout)
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// Collapse runs of whitespace so equivalent FEN spellings share a cache key.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Side to move of a FEN position.
pub fn side_to_move(fen: &str) -> Result<Side, FenError> {
    Ok(parse_fen(fen)?.side_to_move().into())
}

/// Number of pieces (both colours, kings included) on the board.
pub fn piece_count(fen: &str) -> Result<u32, FenError> {
    Ok(parse_fen(fen)?.occupied().len())
}

/// Everything the evaluation pipeline reads from a parsed board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSummary {
    pub side_to_move: Side,
    pub pieces: u32,
    pub status: PositionStatus,
}

pub fn summarize(board: &Board) -> BoardSummary {
    BoardSummary {
        side_to_move: board.side_to_move().into(),
        pieces: board.occupied().len(),
        status: status_of(board),
    }
}

/// Whether the game is already over in this position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Ongoing,
    /// The side to move is checkmated.
    Checkmate,
    /// Stalemate or another board-level draw.
    Drawn,
}

pub fn position_status(fen: &str) -> Result<PositionStatus, FenError> {
    Ok(status_of(&parse_fen(fen)?))
}

fn status_of(board: &Board) -> PositionStatus {
    match board.status() {
        GameStatus::Ongoing => PositionStatus::Ongoing,
        GameStatus::Won => PositionStatus::Checkmate,
        GameStatus::Drawn => PositionStatus::Drawn,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_parse_start_position() {
        let board = parse_fen(START_FEN).unwrap();
        assert_eq!(format_fen(&board), START_FEN);
    }

    #[test]
    fn test_parse_four_field_fen() {
        let board = parse_fen("8/8/8/8/8/8/8/K6k w - -").unwrap();
        assert_eq!(format_fen(&board), "8/8/8/8/8/8/8/K6k w - - 0 1");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_fen(""), Err(FenError::InvalidFormat));
        assert_eq!(parse_fen("not a fen"), Err(FenError::InvalidFormat));
        assert_eq!(
            parse_fen("xxxxxxxx/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::InvalidBoardLayout)
        );
    }

    #[test]
    fn test_normalize_fen() {
        assert_eq!(
            normalize_fen("  8/8/8/8/8/8/8/K6k   w - -  0 1 "),
            "8/8/8/8/8/8/8/K6k w - - 0 1"
        );
    }

    #[test]
    fn test_side_to_move() {
        assert_eq!(side_to_move(START_FEN).unwrap(), Side::White);
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert_eq!(side_to_move(fen).unwrap(), Side::Black);
    }

    #[test]
    fn test_piece_count() {
        assert_eq!(piece_count(START_FEN).unwrap(), 32);
        assert_eq!(piece_count("8/8/8/8/8/8/1Q6/K6k w - - 0 1").unwrap(), 3);
    }

    #[test]
    fn test_position_status() {
        assert_eq!(position_status(START_FEN).unwrap(), PositionStatus::Ongoing);
        // Fool's mate
        let mated = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        assert_eq!(position_status(mated).unwrap(), PositionStatus::Checkmate);
        let stalemate = "k7/8/1Q6/8/8/8/8/2K5 b - - 0 1";
        assert_eq!(position_status(stalemate).unwrap(), PositionStatus::Drawn);
    }

    #[test]
    fn test_summarize_matches_fen_helpers() {
        let mated = "7k/6Q1/5K2/8/8/8/8/8 b - - 1 1";
        let summary = summarize(&parse_fen(mated).unwrap());
        assert_eq!(
            summary,
            BoardSummary {
                side_to_move: Side::Black,
                pieces: 3,
                status: PositionStatus::Checkmate,
            }
        );
        assert_eq!(summarize(&parse_fen(START_FEN).unwrap()).pieces, 32);
    }
}
