pub mod parser;

pub use parser::{parse_uci_message, UciMessage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
    #[error("Invalid move: {0}")]
    InvalidMove(String),
}

impl From<chess::MoveError> for UciError {
    fn from(e: chess::MoveError) -> Self {
        Self::InvalidMove(e.to_string())
    }
}
