//! UCI (coordinate) move notation helpers

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::MoveError;

/// Parse coordinate notation (`e2e4`, `e7e8q`) without checking legality.
pub fn parse_uci_move(s: &str) -> Result<Move, MoveError> {
    let s = s.trim();
    if !(4..=5).contains(&s.len()) || !s.is_ascii() {
        return Err(MoveError::InvalidNotation(s.to_string()));
    }

    let from = parse_square(&s[0..2]).ok_or_else(|| MoveError::InvalidNotation(s.to_string()))?;
    let to = parse_square(&s[2..4]).ok_or_else(|| MoveError::InvalidNotation(s.to_string()))?;
    let promotion = match s.as_bytes().get(4) {
        None => None,
        Some(b'q') | Some(b'Q') => Some(Piece::Queen),
        Some(b'r') | Some(b'R') => Some(Piece::Rook),
        Some(b'b') | Some(b'B') => Some(Piece::Bishop),
        Some(b'n') | Some(b'N') => Some(Piece::Knight),
        Some(_) => return Err(MoveError::InvalidNotation(s.to_string())),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// True if the string has the shape of a coordinate move.
pub fn looks_like_uci(s: &str) -> bool {
    let s = s.trim();
    (4..=5).contains(&s.len())
        && s.is_ascii()
        && parse_square(&s[0..2]).is_some()
        && parse_square(&s[2..4]).is_some()
}

pub(crate) fn parse_square(s: &str) -> Option<Square> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = match bytes[0] {
        b'a'..=b'h' => File::index((bytes[0] - b'a') as usize),
        _ => return None,
    };
    let rank = match bytes[1] {
        b'1'..=b'8' => Rank::index((bytes[1] - b'1') as usize),
        _ => return None,
    };
    Some(Square::new(file, rank))
}

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
pub fn convert_uci_castling_to_cozy(board: &Board, mv: Move) -> Move {
    if board.piece_on(mv.from) != Some(Piece::King) || mv.promotion.is_some() {
        return mv;
    }
    let is_castling_shape = matches!(mv.from.file(), File::E)
        && matches!(mv.to.file(), File::G | File::C)
        && mv.from.rank() == mv.to.rank();
    if !is_castling_shape {
        return mv;
    }

    let rook_file = if mv.to.file() == File::G {
        File::H
    } else {
        File::A
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", mv.from, mv.to);
    if let Some(promo) = mv.promotion {
        s.push(match promo {
            Piece::Queen => 'q',
            Piece::Rook => 'r',
            Piece::Bishop => 'b',
            Piece::Knight => 'n',
            Piece::Pawn => 'p',
            Piece::King => 'k',
        });
    }
    s
}
