//! Game event bus.
//!
//! Broadcasts debate and turn progress to any number of observers (CLI
//! printer, recorders, UIs). Publishing never fails: with no subscribers
//! the event is dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::debate::{AbstentionReason, SelectionSource};
use crate::directive::DirectiveError;
use crate::fraction::{Fraction, Side};
use crate::game::GameStatus;
use crate::rules::Move;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    TurnStarted {
        turn: u32,
        side: Side,
    },
    DirectiveUpdated {
        turn: u32,
        side: Side,
        fraction: Fraction,
        directive: String,
    },
    DirectiveRejected {
        turn: u32,
        side: Side,
        fraction: Fraction,
        error: String,
    },
    ProposalReceived {
        turn: u32,
        side: Side,
        fraction: Fraction,
        mv: Move,
        justification: String,
    },
    FractionAbstained {
        turn: u32,
        side: Side,
        fraction: Fraction,
        reason: AbstentionReason,
    },
    MoveSelected {
        turn: u32,
        side: Side,
        mv: Move,
        source: SelectionSource,
    },
    MoveApplied {
        turn: u32,
        side: Side,
        mv: Move,
        board: String,
    },
    GameEnded {
        turn: u32,
        status: GameStatus,
    },
}

impl GameEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TurnStarted { .. } => "turn_started",
            Self::DirectiveUpdated { .. } => "directive_updated",
            Self::DirectiveRejected { .. } => "directive_rejected",
            Self::ProposalReceived { .. } => "proposal_received",
            Self::FractionAbstained { .. } => "fraction_abstained",
            Self::MoveSelected { .. } => "move_selected",
            Self::MoveApplied { .. } => "move_applied",
            Self::GameEnded { .. } => "game_ended",
        }
    }

    pub fn directive_rejected(
        turn: u32,
        side: Side,
        fraction: Fraction,
        error: &DirectiveError,
    ) -> Self {
        Self::DirectiveRejected {
            turn,
            side,
            fraction,
            error: error.to_string(),
        }
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub struct EventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    pub fn publish(&self, event: GameEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event_type, receivers, "event published"),
            Err(_) => debug!(event_type, "event published (no receivers)"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
