//! Standard Algebraic Notation (SAN)

use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::MoveError;

/// All legal moves of a position, flattened.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// Format a legal move as SAN, including the `+`/`#` suffix.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = san_body(board, mv);

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if after.status() == GameStatus::Won {
            '#'
        } else {
            '+'
        });
    }
    san
}

fn san_body(board: &Board, mv: Move) -> String {
    let piece = match board.piece_on(mv.from) {
        Some(p) => p,
        None => return crate::format_uci_move(mv),
    };

    // cozy-chess encodes castling as the king capturing its own rook
    if piece == Piece::King && board.color_on(mv.to) == board.color_on(mv.from) {
        return if (mv.to.file() as u8) > (mv.from.file() as u8) {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        };
    }

    let is_capture = board.piece_on(mv.to).is_some()
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    let mut san = String::new();
    if piece == Piece::Pawn {
        if is_capture {
            san.push(file_char(mv.from));
        }
    } else {
        san.push(piece_letter(piece));
        san.push_str(&disambiguation(board, mv, piece));
    }

    if is_capture {
        san.push('x');
    }
    san.push_str(&mv.to.to_string());

    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(piece_letter(promo));
    }
    san
}

/// Origin hint needed when another piece of the same kind can reach the target.
fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    let same_file = rivals.iter().any(|o| o.from.file() == mv.from.file());
    let same_rank = rivals.iter().any(|o| o.from.rank() == mv.from.rank());
    match (same_file, same_rank) {
        (false, _) => file_char(mv.from).to_string(),
        (true, false) => rank_char(mv.from).to_string(),
        (true, true) => mv.from.to_string(),
    }
}

/// Parse a SAN move against the legal moves of `board`.
///
/// Check/mate suffixes and annotation glyphs (`!`, `?`) are ignored, and
/// `0-0` is accepted for castling.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, MoveError> {
    let wanted = strip_san(san);
    if wanted.is_empty() {
        return Err(MoveError::InvalidNotation(san.to_string()));
    }

    let mut matches = legal_moves(board)
        .into_iter()
        .filter(|mv| strip_san(&san_body(board, *mv)) == wanted);

    match (matches.next(), matches.next()) {
        (Some(mv), None) => Ok(mv),
        (Some(_), Some(_)) => Err(MoveError::Ambiguous(san.to_string())),
        (None, _) => Err(MoveError::Illegal(san.to_string())),
    }
}

fn strip_san(san: &str) -> String {
    san.trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .replace('0', "O")
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(sq: cozy_chess::Square) -> char {
    (b'a' + sq.file() as u8) as char
}

fn rank_char(sq: cozy_chess::Square) -> char {
    (b'1' + sq.rank() as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;
    use crate::uci::parse_uci_move;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn san_of(fen: &str, uci: &str) -> String {
        let board = parse_fen(fen).unwrap();
        format_san(&board, parse_uci_move(uci).unwrap())
    }

    #[test]
    fn test_format_pawn_push_and_knight() {
        assert_eq!(san_of(START_FEN, "e2e4"), "e4");
        assert_eq!(san_of(START_FEN, "g1f3"), "Nf3");
    }

    #[test]
    fn test_format_capture() {
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2";
        assert_eq!(san_of(fen, "e4d5"), "exd5");
    }

    #[test]
    fn test_format_castling() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 0 1";
        assert_eq!(san_of(fen, "e1h1"), "O-O");
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/R3KBNR w KQkq - 0 1";
        assert_eq!(san_of(fen, "e1a1"), "O-O-O");
    }

    #[test]
    fn test_format_promotion_and_disambiguation() {
        assert_eq!(san_of("8/P7/8/8/8/8/8/4K2k w - - 0 1", "a7a8q"), "a8=Q+");
        let two_rooks = "4k3/8/8/8/8/8/4K3/R6R w - - 0 1";
        assert_eq!(san_of(two_rooks, "a1d1"), "Rad1");
    }

    #[test]
    fn test_format_mate_suffix() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        assert_eq!(san_of(fen, "d8h4"), "Qh4#");
    }

    #[test]
    fn test_parse_san() {
        let board = parse_fen(START_FEN).unwrap();
        let mv = parse_san(&board, "Nf3").unwrap();
        assert_eq!(crate::format_uci_move(mv), "g1f3");
        let mv = parse_san(&board, "e4!?").unwrap();
        assert_eq!(crate::format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_parse_san_castling_with_zeros() {
        let board = parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 0 1").unwrap();
        let mv = parse_san(&board, "0-0").unwrap();
        assert_eq!(crate::format_uci_move(mv), "e1h1");
    }

    #[test]
    fn test_parse_san_illegal() {
        let board = parse_fen(START_FEN).unwrap();
        assert!(matches!(parse_san(&board, "Ke2"), Err(MoveError::Illegal(_))));
        assert!(matches!(
            parse_san(&board, ""),
            Err(MoveError::InvalidNotation(_))
        ));
    }
}
