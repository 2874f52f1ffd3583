//! Fraction council for Prompt Chess.
//!
//! Each non-royal piece type of a side is a *fraction* steered by a
//! natural-language directive. Every turn the side's active fractions
//! propose moves concurrently, the king arbitrates, and deterministic
//! fallbacks guarantee a legal move whatever the agents do.
//!
//! - [`rules`]: rules adapter contract and the `shakmaty` implementation
//! - [`directive`]: directive store with per-turn update quota
//! - [`debate`]: bounded one-round debate and royal arbitration
//! - [`game`]: turn controller, score and game records
//! - [`agent`]: capability trait implemented by LLM or scripted agents

pub mod agent;
pub mod config;
pub mod debate;
pub mod directive;
pub mod events;
pub mod fraction;
pub mod game;
pub mod rules;

pub use agent::{
    AgentError, FractionAgent, PromptUpdate, ProposalReply, ProposalRequest, RoyalReply,
    RoyalRequest, SharedAgent, UpdateRequest,
};
pub use config::{ConfigError, DirectiveConfig, GameConfig};
pub use debate::{
    AbstentionReason, DebateConfig, DebateError, DebateOrchestrator, DebateOutcome, Proposal,
    RoyalOutcome, Selection, SelectionSource, Transcript, TranscriptEntry,
};
pub use directive::{DirectiveError, DirectivePolicy, InvalidReason, PromptStore, UpdateRecord};
pub use events::{EventBus, GameEvent, SharedEventBus};
pub use fraction::{Fraction, Mover, Side};
pub use game::{
    GameController, GameError, GameRecord, GameStatus, MoveRecord, PersistenceError, Scoreboard,
    SideAgents, TerminalReason, TurnReport, UpdateOutcome,
};
pub use rules::{
    BoardStatus, ChessPosition, LegalMove, Move, PositionSnapshot, RulesEngine, RulesError,
    StandardChess,
};
