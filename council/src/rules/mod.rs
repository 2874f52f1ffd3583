//! Rules adapter contract.
//!
//! The council never computes chess legality itself. Everything it needs
//! from the game of chess goes through [`RulesEngine`]: legal moves tagged
//! with the piece type that would execute them, move application, and the
//! terminal status of a position.
//!
//! [`StandardChess`] is the production implementation, backed by
//! `shakmaty`.

pub mod standard;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fraction::{Fraction, Mover, Side};

pub use standard::{ChessPosition, StandardChess};

/// A move in long algebraic (UCI) notation, e.g. `e2e4` or `e7e8q`.
///
/// Moves order lexicographically by their notation, which is the order
/// used by the legal-move fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Move(String);

impl Move {
    pub fn new(notation: impl Into<String>) -> Self {
        Self(notation.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Move {
    fn from(notation: &str) -> Self {
        Self::new(notation)
    }
}

/// A legal move together with the piece type that executes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalMove {
    pub mv: Move,
    pub mover: Mover,
}

/// Status of a single position as reported by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardStatus {
    InProgress,
    Check,
    Checkmate,
    Stalemate,
    Draw,
}

impl BoardStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate | Self::Draw)
    }
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Check => write!(f, "check"),
            Self::Checkmate => write!(f, "checkmate"),
            Self::Stalemate => write!(f, "stalemate"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Textual view of a position handed to agents and written to records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Piece placement plus side to move, e.g. `rnbqkbnr/... w`.
    pub key: String,
    /// Full FEN, including castling rights, en passant square and clocks.
    pub fen: String,
    /// 8x8 ASCII board, upper case for white pieces.
    pub board: String,
    pub side_to_move: Side,
}

/// Errors raised by a rules engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("invalid move {mv}: not legal in this position")]
    InvalidMove { mv: Move },

    #[error("invalid position: {0}")]
    InvalidPosition(String),
}

/// Black-box chess rules consumed by the council.
///
/// Implementations must be pure: the same position always yields the same
/// legal moves and the same successor for a given move. Replaying a game
/// log relies on it.
pub trait RulesEngine: Send + Sync + 'static {
    type Position: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    fn initial_position(&self) -> Self::Position;

    /// Rebuild a position from the `fen` of a [`PositionSnapshot`].
    fn restore(&self, fen: &str) -> Result<Self::Position, RulesError>;

    /// Legal moves for the side to move. Empty only for terminal positions.
    fn legal_moves(&self, position: &Self::Position) -> Vec<LegalMove>;

    /// Play `mv`, failing with [`RulesError::InvalidMove`] if it is not legal.
    fn apply(&self, position: &Self::Position, mv: &Move) -> Result<Self::Position, RulesError>;

    fn status(&self, position: &Self::Position) -> BoardStatus;

    fn side_to_move(&self, position: &Self::Position) -> Side;

    /// Fraction types with at least one surviving piece for `side`.
    fn active_fractions(&self, position: &Self::Position, side: Side) -> BTreeSet<Fraction>;

    /// Total material of `side`, king included.
    fn material(&self, position: &Self::Position, side: Side) -> u32;

    fn snapshot(&self, position: &Self::Position) -> PositionSnapshot;
}

/// Render an ASCII board from a FEN piece-placement field.
///
/// Ranks are printed from 8 down to 1 with empty squares as `.`.
pub fn render_placement(placement: &str) -> String {
    let mut out = String::new();
    for (index, rank) in placement.split('/').enumerate() {
        out.push_str(&format!("{} ", 8 - index));
        let mut squares = Vec::with_capacity(8);
        for ch in rank.chars() {
            match ch.to_digit(10) {
                Some(empty) => squares.extend(std::iter::repeat('.').take(empty as usize)),
                None => squares.push(ch),
            }
        }
        let line: Vec<String> = squares.iter().map(|c| c.to_string()).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out.push_str("  a b c d e f g h");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_order_by_notation() {
        let mut moves = vec![Move::from("b1c3"), Move::from("a2a4"), Move::from("a2a3")];
        moves.sort();
        assert_eq!(
            moves,
            vec![Move::from("a2a3"), Move::from("a2a4"), Move::from("b1c3")]
        );
    }

    #[test]
    fn test_render_placement_expands_empty_squares() {
        let board = render_placement("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR");
        let lines: Vec<&str> = board.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "8 r n b q k b n r");
        assert_eq!(lines[4], "4 . . . . P . . .");
        assert_eq!(lines[6], "2 P P P P . P P P");
        assert_eq!(lines[8], "  a b c d e f g h");
    }

    #[test]
    fn test_board_status_terminality() {
        assert!(!BoardStatus::InProgress.is_terminal());
        assert!(!BoardStatus::Check.is_terminal());
        assert!(BoardStatus::Checkmate.is_terminal());
        assert!(BoardStatus::Stalemate.is_terminal());
        assert!(BoardStatus::Draw.is_terminal());
    }

    #[test]
    fn test_move_serializes_as_plain_string() {
        let json = serde_json::to_string(&Move::from("e2e4")).unwrap();
        assert_eq!(json, "\"e2e4\"");
    }
}
