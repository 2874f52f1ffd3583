//! Per-turn debate record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fraction::{Fraction, Side};
use crate::rules::Move;

/// A fraction's surviving bid for the turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub fraction: Fraction,
    pub mv: Move,
    pub justification: String,
    pub round: u32,
}

impl Proposal {
    /// Ordering key of the proposal fallback: earliest round, then lowest
    /// fraction ordinal, then smallest move notation.
    pub fn fallback_key(&self) -> (u32, u8, &Move) {
        (self.round, self.fraction.ordinal(), &self.mv)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbstentionReason {
    /// The fraction has no surviving piece.
    NoPieces,
    /// The fraction's pieces have no legal move.
    NoLegalMoves,
    /// The per-call budget ran out.
    Timeout { budget_ms: u64 },
    /// The shared round deadline passed first.
    DeadlineExceeded,
    AgentError { message: String },
    /// Proposed move outside the fraction's legal subset.
    IllegalMove { mv: Move },
    /// The proposal task panicked or was cancelled.
    TaskFailed { message: String },
}

impl AbstentionReason {
    /// True when the fraction was never asked to propose.
    pub fn is_not_invited(&self) -> bool {
        matches!(self, Self::NoPieces | Self::NoLegalMoves)
    }
}

impl fmt::Display for AbstentionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPieces => write!(f, "no surviving pieces"),
            Self::NoLegalMoves => write!(f, "no legal moves"),
            Self::Timeout { budget_ms } => write!(f, "timed out after {}ms", budget_ms),
            Self::DeadlineExceeded => write!(f, "round deadline exceeded"),
            Self::AgentError { message } => write!(f, "agent error: {}", message),
            Self::IllegalMove { mv } => write!(f, "proposed illegal move {}", mv),
            Self::TaskFailed { message } => write!(f, "task failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstention {
    pub fraction: Fraction,
    pub reason: AbstentionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Proposal(Proposal),
    Abstention(Abstention),
}

impl TranscriptEntry {
    pub fn fraction(&self) -> Fraction {
        match self {
            Self::Proposal(p) => p.fraction,
            Self::Abstention(a) => a.fraction,
        }
    }
}

/// What happened in the royal decision step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoyalOutcome {
    /// No proposal survived, so the king was not consulted.
    Skipped,
    Accepted { mv: Move, reasoning: String },
    /// The king named a move that no surviving proposal carries.
    Rejected { mv: Move, reasoning: String },
    TimedOut { budget_ms: u64 },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SelectionSource {
    /// The king endorsed this fraction's proposal.
    Royal { fraction: Fraction },
    /// Deterministic pick among surviving proposals.
    ProposalFallback { fraction: Fraction },
    /// Smallest legal move, used when no proposal survived.
    LegalFallback,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Royal { fraction } => write!(f, "royal decision ({})", fraction),
            Self::ProposalFallback { fraction } => write!(f, "proposal fallback ({})", fraction),
            Self::LegalFallback => write!(f, "legal-move fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub mv: Move,
    pub source: SelectionSource,
}

/// Complete record of one turn's debate. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    turn: u32,
    side: Side,
    entries: Vec<TranscriptEntry>,
    royal: RoyalOutcome,
    selection: Selection,
}

impl Transcript {
    pub(crate) fn new(
        turn: u32,
        side: Side,
        entries: Vec<TranscriptEntry>,
        royal: RoyalOutcome,
        selection: Selection,
    ) -> Self {
        Self {
            turn,
            side,
            entries,
            royal,
            selection,
        }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Entries in fraction order, one per fraction.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.entries.iter().filter_map(|entry| match entry {
            TranscriptEntry::Proposal(p) => Some(p),
            TranscriptEntry::Abstention(_) => None,
        })
    }

    pub fn abstentions(&self) -> impl Iterator<Item = &Abstention> {
        self.entries.iter().filter_map(|entry| match entry {
            TranscriptEntry::Abstention(a) => Some(a),
            TranscriptEntry::Proposal(_) => None,
        })
    }

    pub fn abstention_for(&self, fraction: Fraction) -> Option<&AbstentionReason> {
        self.abstentions()
            .find(|a| a.fraction == fraction)
            .map(|a| &a.reason)
    }

    pub fn royal(&self) -> &RoyalOutcome {
        &self.royal
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn chosen(&self) -> &Move {
        &self.selection.mv
    }
}
