use chess::MoveError;

/// Plays a move on a position. Used to find the position after a move
/// for quality assessment.
pub trait MoveApplier: Send + Sync {
    /// Resulting FEN, or an error if the move is unreadable or illegal.
    fn apply(&self, fen: &str, notation: &str) -> Result<String, MoveError>;
}

/// Accepts coordinate (`e2e4`, `e1g1`) and SAN (`Nf3`, `O-O`) notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMoveApplier;

impl MoveApplier for StandardMoveApplier {
    fn apply(&self, fen: &str, notation: &str) -> Result<String, MoveError> {
        chess::apply_move(fen, notation)
    }
}
