//! Per-turn fraction debate.

pub mod fallback;
pub mod orchestrator;
pub mod transcript;

pub use fallback::{legal_fallback, proposal_fallback};
pub use orchestrator::{DebateConfig, DebateError, DebateOrchestrator, DebateOutcome};
pub use transcript::{
    Abstention, AbstentionReason, Proposal, RoyalOutcome, Selection, SelectionSource, Transcript,
    TranscriptEntry,
};
