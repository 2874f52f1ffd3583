//! Game state: position, history, transcripts and score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::debate::Transcript;
use crate::directive::PromptStore;
use crate::fraction::Side;
use crate::rules::{BoardStatus, Move, RulesEngine};

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminalReason {
    Checkmate { winner: Side },
    Stalemate,
    Draw,
    MaxTurnsReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Terminal(TerminalReason),
}

impl GameStatus {
    /// Map a board status to a game status. `side_to_move` is the side
    /// that would move next in the position.
    pub fn from_board(board: BoardStatus, side_to_move: Side) -> Self {
        match board {
            BoardStatus::InProgress | BoardStatus::Check => Self::InProgress,
            BoardStatus::Checkmate => Self::Terminal(TerminalReason::Checkmate {
                winner: side_to_move.opponent(),
            }),
            BoardStatus::Stalemate => Self::Terminal(TerminalReason::Stalemate),
            BoardStatus::Draw => Self::Terminal(TerminalReason::Draw),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            Self::Terminal(TerminalReason::Checkmate { winner }) => Some(*winner),
            _ => None,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in progress"),
            Self::Terminal(TerminalReason::Checkmate { winner }) => {
                write!(f, "checkmate, {} wins", winner)
            }
            Self::Terminal(TerminalReason::Stalemate) => write!(f, "stalemate"),
            Self::Terminal(TerminalReason::Draw) => write!(f, "draw"),
            Self::Terminal(TerminalReason::MaxTurnsReached) => write!(f, "turn limit reached"),
        }
    }
}

/// One applied move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRecord<P> {
    pub side: Side,
    pub mv: Move,
    /// Position after the move.
    pub position: P,
    pub turn: u32,
}

/// Points per side: one per move played plus the value of every capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub white: u32,
    pub black: u32,
}

impl Scoreboard {
    pub fn points(&self, side: Side) -> u32 {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    pub fn record_move(&mut self, side: Side, captured: u32) {
        let points = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        *points += 1 + captured;
    }
}

#[derive(Debug, Clone)]
pub struct GameState<P> {
    pub(crate) initial: P,
    pub(crate) position: P,
    pub(crate) side_to_move: Side,
    pub(crate) turn: u32,
    pub(crate) status: GameStatus,
    pub(crate) directives: PromptStore,
    pub(crate) history: Vec<MoveRecord<P>>,
    pub(crate) transcripts: Vec<Transcript>,
    pub(crate) scoreboard: Scoreboard,
}

impl<P: Clone> GameState<P> {
    /// State of a new game at the rules engine's initial position.
    pub fn new<R: RulesEngine<Position = P>>(rules: &R, directives: PromptStore) -> Self {
        let initial = rules.initial_position();
        let side_to_move = rules.side_to_move(&initial);
        let status = GameStatus::from_board(rules.status(&initial), side_to_move);
        Self {
            position: initial.clone(),
            initial,
            side_to_move,
            turn: 0,
            status,
            directives,
            history: Vec::new(),
            transcripts: Vec::new(),
            scoreboard: Scoreboard::default(),
        }
    }

    pub fn initial(&self) -> &P {
        &self.initial
    }

    pub fn position(&self) -> &P {
        &self.position
    }

    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn directives(&self) -> &PromptStore {
        &self.directives
    }

    pub fn history(&self) -> &[MoveRecord<P>] {
        &self.history
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }
}
