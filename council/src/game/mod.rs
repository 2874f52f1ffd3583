//! Game state, turn sequencing and records.

pub mod controller;
pub mod replay;
pub mod state;

pub use controller::{GameController, GameError, SideAgents, TurnReport, UpdateOutcome};
pub use replay::{replay, GameRecord, PersistenceError, RecordedMove};
pub use state::{GameState, GameStatus, MoveRecord, Scoreboard, TerminalReason};
