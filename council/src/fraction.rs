//! Sides, fractions and piece values.
//!
//! A fraction is one of the five non-royal piece types. The king never
//! belongs to a fraction and never carries a directive; it only shows up
//! here as a [`Mover`] so legal moves can be partitioned by who executes
//! them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Material value of the king, used by the scoreboard's health totals.
pub const KING_VALUE: u32 = 10;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::White, Side::Black];

    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

/// A non-royal piece type with its own behavioural directive.
///
/// Variant order is the fraction ordinal used by the deterministic
/// fallback: pawn < knight < bishop < rook < queen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fraction {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
}

impl Fraction {
    pub const ALL: [Fraction; 5] = [
        Fraction::Pawn,
        Fraction::Knight,
        Fraction::Bishop,
        Fraction::Rook,
        Fraction::Queen,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Material value of one piece of this type.
    pub fn value(self) -> u32 {
        match self {
            Self::Pawn => 1,
            Self::Knight | Self::Bishop => 3,
            Self::Rook => 5,
            Self::Queen => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
        }
    }

    /// Capitalised name, as used in prompts and transcripts.
    pub fn title(self) -> &'static str {
        match self {
            Self::Pawn => "Pawn",
            Self::Knight => "Knight",
            Self::Bishop => "Bishop",
            Self::Rook => "Rook",
            Self::Queen => "Queen",
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string does not name a fraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fraction '{0}' (expected pawn, knight, bishop, rook or queen)")]
pub struct ParseFractionError(pub String);

impl FromStr for Fraction {
    type Err = ParseFractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pawn" | "pawns" | "p" => Ok(Self::Pawn),
            "knight" | "knights" | "n" => Ok(Self::Knight),
            "bishop" | "bishops" | "b" => Ok(Self::Bishop),
            "rook" | "rooks" | "r" => Ok(Self::Rook),
            "queen" | "queens" | "q" => Ok(Self::Queen),
            _ => Err(ParseFractionError(s.to_string())),
        }
    }
}

/// The piece type executing a legal move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mover {
    Fraction(Fraction),
    King,
}

impl Mover {
    /// The fraction behind this move, `None` for king moves.
    pub fn fraction(self) -> Option<Fraction> {
        match self {
            Self::Fraction(fraction) => Some(fraction),
            Self::King => None,
        }
    }

    pub fn value(self) -> u32 {
        match self {
            Self::Fraction(fraction) => fraction.value(),
            Self::King => KING_VALUE,
        }
    }
}

impl fmt::Display for Mover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fraction(fraction) => write!(f, "{}", fraction),
            Self::King => write!(f, "king"),
        }
    }
}
