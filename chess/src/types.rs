//! Side/colour type shared by the board helpers and the evaluation pipeline.
//! cozy-chess types stay an implementation detail of this crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A player, used both as "side to move" and as an evaluation perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl Side {
    /// Single-letter FEN code (`'w'` / `'b'`).
    pub fn code(self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Parse a perspective code, treating anything unrecognised as White.
    pub fn from_code_or_white(code: &str) -> Self {
        code.parse().unwrap_or(Self::White)
    }
}

impl FromStr for Side {
    type Err = UnknownSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "white" => Ok(Self::White),
            "b" | "black" => Ok(Self::Black),
            _ => Err(UnknownSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<cozy_chess::Color> for Side {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

impl From<Side> for cozy_chess::Color {
    fn from(s: Side) -> Self {
        match s {
            Side::White => Self::White,
            Side::Black => Self::Black,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown side: {0}")]
pub struct UnknownSide(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes() {
        assert_eq!("w".parse::<Side>().unwrap(), Side::White);
        assert_eq!("b".parse::<Side>().unwrap(), Side::Black);
        assert_eq!("Black".parse::<Side>().unwrap(), Side::Black);
        assert!("x".parse::<Side>().is_err());
    }

    #[test]
    fn test_unknown_code_defaults_to_white() {
        assert_eq!(Side::from_code_or_white("z"), Side::White);
        assert_eq!(Side::from_code_or_white(""), Side::White);
        assert_eq!(Side::from_code_or_white("b"), Side::Black);
    }

    #[test]
    fn test_display_is_fen_code() {
        assert_eq!(Side::White.to_string(), "w");
        assert_eq!(Side::Black.opposite().to_string(), "w");
    }
}
