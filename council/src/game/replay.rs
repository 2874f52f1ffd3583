//! Game records and replay.
//!
//! A [`GameRecord`] is the JSON export of a finished or interrupted game:
//! moves, debate transcripts, directive audit log and score. Replaying the
//! moves on the same rules engine must reproduce every recorded position.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::state::{GameStatus, Scoreboard};
use crate::debate::Transcript;
use crate::directive::UpdateRecord;
use crate::fraction::Side;
use crate::rules::{Move, PositionSnapshot, RulesEngine, RulesError};

/// Re-apply `moves` from `initial`.
pub fn replay<'a, R: RulesEngine>(
    rules: &R,
    initial: &R::Position,
    moves: impl IntoIterator<Item = &'a Move>,
) -> Result<R::Position, RulesError> {
    moves
        .into_iter()
        .try_fold(initial.clone(), |position, mv| rules.apply(&position, mv))
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialize failed: {0}")]
    Serialize(String),

    #[error("deserialize failed: {0}")]
    Deserialize(String),

    #[error("version mismatch: expected at most {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay diverged at turn {turn}: expected {expected}, got {found}")]
    ReplayMismatch {
        turn: u32,
        expected: String,
        found: String,
    },

    #[error("replay failed: {0}")]
    Rules(#[from] RulesError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMove {
    pub turn: u32,
    pub side: Side,
    pub mv: Move,
    /// Position key after the move.
    pub position: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub version: u32,
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub max_turns: u32,
    pub initial: PositionSnapshot,
    pub moves: Vec<RecordedMove>,
    pub transcripts: Vec<Transcript>,
    pub directive_log: Vec<UpdateRecord>,
    pub scoreboard: Scoreboard,
    pub status: GameStatus,
}

impl GameRecord {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::Serialize(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let record: Self =
            serde_json::from_str(json).map_err(|e| PersistenceError::Deserialize(e.to_string()))?;
        if record.version > Self::CURRENT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                found: record.version,
            });
        }
        Ok(record)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Replay the recorded moves from the recorded start position,
    /// checking every position key. Needs no game-specific setup on `rules`.
    pub fn replay_on<R: RulesEngine>(&self, rules: &R) -> Result<R::Position, PersistenceError> {
        let mut position = rules.restore(&self.initial.fen)?;
        let start = rules.snapshot(&position).key;
        if start != self.initial.key {
            return Err(PersistenceError::ReplayMismatch {
                turn: 0,
                expected: self.initial.key.clone(),
                found: start,
            });
        }
        for recorded in &self.moves {
            position = rules.apply(&position, &recorded.mv)?;
            let key = rules.snapshot(&position).key;
            if key != recorded.position {
                return Err(PersistenceError::ReplayMismatch {
                    turn: recorded.turn,
                    expected: recorded.position.clone(),
                    found: key,
                });
            }
        }
        Ok(position)
    }
}
