//! Agent capability consumed by the debate.
//!
//! How a proposal is produced (LLM, script, human) is not the council's
//! concern. Time budgets are enforced by the caller, so implementations may
//! block for as long as they like.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debate::{Proposal, TranscriptEntry};
use crate::fraction::{Fraction, Side};
use crate::rules::{Move, PositionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("agent communication failed: {0}")]
    Communication(String),

    #[error("agent reply could not be parsed: {0}")]
    Parse(String),

    #[error("agent unavailable: {0}")]
    Unavailable(String),
}

/// Input of one fraction's proposal call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub side: Side,
    pub fraction: Fraction,
    pub snapshot: PositionSnapshot,
    pub directive: String,
    /// Legal moves executed by this fraction's pieces, sorted.
    pub legal_moves: Vec<Move>,
    /// Entries of earlier rounds. Empty in a single-round debate.
    pub transcript: Vec<TranscriptEntry>,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalReply {
    pub mv: Move,
    pub justification: String,
}

/// Input of the royal decision call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoyalRequest {
    pub side: Side,
    pub snapshot: PositionSnapshot,
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyalReply {
    pub mv: Move,
    pub reasoning: String,
}

/// Input of the strategist call that may rewrite one directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub side: Side,
    pub turn: u32,
    pub snapshot: PositionSnapshot,
    pub own: BTreeMap<Fraction, String>,
    pub opponent: BTreeMap<Fraction, String>,
    pub active: BTreeSet<Fraction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptUpdate {
    pub fraction: Fraction,
    pub directive: String,
    pub rationale: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FractionAgent: Send + Sync {
    /// One fraction proposes a move from its own legal subset.
    async fn propose(&self, request: ProposalRequest) -> Result<ProposalReply, AgentError>;

    /// The king picks among the surviving proposals.
    async fn decide(&self, request: RoyalRequest) -> Result<RoyalReply, AgentError>;

    /// Optionally rewrite one of the side's directives before the debate.
    async fn suggest_update(
        &self,
        request: UpdateRequest,
    ) -> Result<Option<PromptUpdate>, AgentError>;
}

pub type SharedAgent = Arc<dyn FractionAgent>;
