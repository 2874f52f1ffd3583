//! Debate orchestrator: one bounded proposal round plus royal arbitration.
//!
//! Every invited fraction is asked concurrently, each call under its own
//! budget and all of them under a shared round deadline. Whatever goes
//! wrong with a single fraction turns into an abstention. The king then
//! picks among the surviving proposals; if the king cannot settle it, a
//! deterministic fallback does. The only way a debate fails is a position
//! with no legal moves at all.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::{Id as TaskId, JoinSet};
use tokio::time::error::Elapsed;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use super::fallback::{legal_fallback, proposal_fallback};
use super::transcript::{
    Abstention, AbstentionReason, Proposal, RoyalOutcome, Selection, SelectionSource, Transcript,
    TranscriptEntry,
};
use crate::agent::{AgentError, ProposalReply, ProposalRequest, RoyalRequest, SharedAgent};
use crate::directive::PromptStore;
use crate::events::{GameEvent, SharedEventBus};
use crate::fraction::{Fraction, Side};
use crate::rules::{Move, PositionSnapshot, RulesEngine};

/// Round number of the single proposal round.
const PROPOSAL_ROUND: u32 = 1;

/// Time budgets of a debate, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Budget of one fraction's proposal call.
    pub proposal_timeout_ms: u64,
    /// Shared deadline of the whole proposal round.
    pub round_deadline_ms: u64,
    /// Budget of the royal decision call.
    pub royal_timeout_ms: u64,
}

impl DebateConfig {
    pub fn proposal_timeout(&self) -> Duration {
        Duration::from_millis(self.proposal_timeout_ms)
    }

    pub fn round_deadline(&self) -> Duration {
        Duration::from_millis(self.round_deadline_ms)
    }

    pub fn royal_timeout(&self) -> Duration {
        Duration::from_millis(self.royal_timeout_ms)
    }

    /// Upper bound on the wall-clock time of one debate.
    pub fn worst_case(&self) -> Duration {
        self.round_deadline() + self.royal_timeout()
    }
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            proposal_timeout_ms: 30_000,
            round_deadline_ms: 45_000,
            royal_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebateError {
    #[error("no legal moves for {side} on turn {turn}")]
    NoLegalMoves { side: Side, turn: u32 },
}

/// The move a debate settled on and how it got there.
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    pub mv: Move,
    pub transcript: Transcript,
}

type ProposalResult = Result<Result<ProposalReply, AgentError>, Elapsed>;

pub struct DebateOrchestrator {
    config: DebateConfig,
    events: Option<SharedEventBus>,
}

impl DebateOrchestrator {
    pub fn new(config: DebateConfig) -> Self {
        Self {
            config,
            events: None,
        }
    }

    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Run one debate for the side to move in `position`.
    pub async fn decide_move<R: RulesEngine>(
        &self,
        rules: &R,
        position: &R::Position,
        turn: u32,
        directives: &PromptStore,
        agent: &SharedAgent,
    ) -> Result<DebateOutcome, DebateError> {
        let side = rules.side_to_move(position);
        let legal = rules.legal_moves(position);
        if legal.is_empty() {
            return Err(DebateError::NoLegalMoves { side, turn });
        }
        let legal_set: BTreeSet<Move> = legal.iter().map(|m| m.mv.clone()).collect();

        let mut subsets: BTreeMap<Fraction, Vec<Move>> = BTreeMap::new();
        for m in &legal {
            if let Some(fraction) = m.mover.fraction() {
                subsets.entry(fraction).or_default().push(m.mv.clone());
            }
        }
        let active = rules.active_fractions(position, side);
        let snapshot = rules.snapshot(position);

        let mut slots: BTreeMap<Fraction, TranscriptEntry> = BTreeMap::new();
        let mut invited = Vec::new();
        for fraction in Fraction::ALL {
            let mut moves = subsets.remove(&fraction).unwrap_or_default();
            if !active.contains(&fraction) {
                self.abstain(&mut slots, turn, side, fraction, AbstentionReason::NoPieces);
            } else if moves.is_empty() {
                self.abstain(&mut slots, turn, side, fraction, AbstentionReason::NoLegalMoves);
            } else {
                moves.sort();
                invited.push((fraction, moves));
            }
        }

        debug!(
            side = %side,
            turn,
            invited = invited.len(),
            legal = legal.len(),
            "debate round opening"
        );
        self.run_round(turn, side, &snapshot, directives, agent, invited, &mut slots)
            .await;

        let entries: Vec<TranscriptEntry> = slots.into_values().collect();
        let proposals: Vec<Proposal> = entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Proposal(p) => Some(p.clone()),
                TranscriptEntry::Abstention(_) => None,
            })
            .collect();

        let (royal, royal_pick) = if proposals.is_empty() {
            (RoyalOutcome::Skipped, None)
        } else {
            self.consult_king(side, &snapshot, &proposals, agent).await
        };

        let selection = match royal_pick.filter(|(mv, _)| legal_set.contains(mv)) {
            Some((mv, fraction)) => Selection {
                mv,
                source: SelectionSource::Royal { fraction },
            },
            None => match proposal_fallback(&proposals, &legal_set) {
                Some(p) => Selection {
                    mv: p.mv.clone(),
                    source: SelectionSource::ProposalFallback {
                        fraction: p.fraction,
                    },
                },
                None => Selection {
                    mv: legal_fallback(&legal)
                        .cloned()
                        .ok_or(DebateError::NoLegalMoves { side, turn })?,
                    source: SelectionSource::LegalFallback,
                },
            },
        };

        info!(
            side = %side,
            turn,
            mv = %selection.mv,
            source = %selection.source,
            proposals = proposals.len(),
            "move selected"
        );
        self.publish(GameEvent::MoveSelected {
            turn,
            side,
            mv: selection.mv.clone(),
            source: selection.source,
        });

        Ok(DebateOutcome {
            mv: selection.mv.clone(),
            transcript: Transcript::new(turn, side, entries, royal, selection),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_round(
        &self,
        turn: u32,
        side: Side,
        snapshot: &PositionSnapshot,
        directives: &PromptStore,
        agent: &SharedAgent,
        invited: Vec<(Fraction, Vec<Move>)>,
        slots: &mut BTreeMap<Fraction, TranscriptEntry>,
    ) {
        let budget = self.config.proposal_timeout();
        let deadline = Instant::now() + self.config.round_deadline();
        let mut join_set: JoinSet<(Fraction, ProposalResult)> = JoinSet::new();
        let mut pending: BTreeMap<Fraction, BTreeSet<Move>> = BTreeMap::new();
        let mut tasks: BTreeMap<TaskId, Fraction> = BTreeMap::new();

        for (fraction, moves) in invited {
            let request = ProposalRequest {
                side,
                fraction,
                snapshot: snapshot.clone(),
                directive: directives.get(side, fraction).to_string(),
                legal_moves: moves.clone(),
                transcript: Vec::new(),
                round: PROPOSAL_ROUND,
            };
            pending.insert(fraction, moves.into_iter().collect());
            let agent = Arc::clone(agent);
            let handle = join_set
                .spawn(async move { (fraction, timeout(budget, agent.propose(request)).await) });
            tasks.insert(handle.id(), fraction);
        }

        loop {
            match timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok((fraction, result)))) => {
                    if let Some(subset) = pending.remove(&fraction) {
                        let entry = self.settle(fraction, result, &subset);
                        self.record(slots, turn, side, entry);
                    }
                }
                Ok(Some(Err(e))) => {
                    let Some(fraction) = tasks.get(&e.id()).copied() else {
                        warn!(side = %side, turn, error = %e, "unknown proposal task failed");
                        continue;
                    };
                    warn!(
                        side = %side,
                        turn,
                        fraction = %fraction,
                        error = %e,
                        "proposal task failed"
                    );
                    if pending.remove(&fraction).is_some() {
                        self.abstain(
                            slots,
                            turn,
                            side,
                            fraction,
                            AbstentionReason::TaskFailed {
                                message: e.to_string(),
                            },
                        );
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        side = %side,
                        turn,
                        pending = pending.len(),
                        "round deadline reached, cancelling pending proposals"
                    );
                    join_set.abort_all();
                    for fraction in std::mem::take(&mut pending).into_keys() {
                        self.abstain(slots, turn, side, fraction, AbstentionReason::DeadlineExceeded);
                    }
                    break;
                }
            }
        }

        // Anything still pending belonged to a task that never reported back.
        for fraction in pending.into_keys() {
            self.abstain(
                slots,
                turn,
                side,
                fraction,
                AbstentionReason::TaskFailed {
                    message: "task ended without a result".to_string(),
                },
            );
        }
    }

    fn settle(
        &self,
        fraction: Fraction,
        result: ProposalResult,
        subset: &BTreeSet<Move>,
    ) -> TranscriptEntry {
        let reason = match result {
            Err(_) => AbstentionReason::Timeout {
                budget_ms: self.config.proposal_timeout_ms,
            },
            Ok(Err(e)) => AbstentionReason::AgentError {
                message: e.to_string(),
            },
            Ok(Ok(reply)) if !subset.contains(&reply.mv) => {
                AbstentionReason::IllegalMove { mv: reply.mv }
            }
            Ok(Ok(reply)) => {
                return TranscriptEntry::Proposal(Proposal {
                    fraction,
                    mv: reply.mv,
                    justification: reply.justification,
                    round: PROPOSAL_ROUND,
                })
            }
        };
        TranscriptEntry::Abstention(Abstention { fraction, reason })
    }

    async fn consult_king(
        &self,
        side: Side,
        snapshot: &PositionSnapshot,
        proposals: &[Proposal],
        agent: &SharedAgent,
    ) -> (RoyalOutcome, Option<(Move, Fraction)>) {
        let request = RoyalRequest {
            side,
            snapshot: snapshot.clone(),
            proposals: proposals.to_vec(),
        };
        let budget = self.config.royal_timeout();
        let agent = Arc::clone(agent);
        let call = tokio::spawn(async move { timeout(budget, agent.decide(request)).await });

        match call.await {
            Ok(Ok(Ok(reply))) => match proposals.iter().find(|p| p.mv == reply.mv) {
                Some(p) => {
                    let pick = (p.mv.clone(), p.fraction);
                    (
                        RoyalOutcome::Accepted {
                            mv: reply.mv,
                            reasoning: reply.reasoning,
                        },
                        Some(pick),
                    )
                }
                None => {
                    warn!(side = %side, mv = %reply.mv, "royal choice is not a surviving proposal");
                    (
                        RoyalOutcome::Rejected {
                            mv: reply.mv,
                            reasoning: reply.reasoning,
                        },
                        None,
                    )
                }
            },
            Ok(Ok(Err(e))) => {
                warn!(side = %side, error = %e, "royal decision failed");
                (
                    RoyalOutcome::Failed {
                        message: e.to_string(),
                    },
                    None,
                )
            }
            Ok(Err(_)) => {
                warn!(side = %side, budget_ms = self.config.royal_timeout_ms, "royal decision timed out");
                (
                    RoyalOutcome::TimedOut {
                        budget_ms: self.config.royal_timeout_ms,
                    },
                    None,
                )
            }
            Err(e) => {
                warn!(side = %side, error = %e, "royal decision task failed");
                (
                    RoyalOutcome::Failed {
                        message: e.to_string(),
                    },
                    None,
                )
            }
        }
    }

    fn abstain(
        &self,
        slots: &mut BTreeMap<Fraction, TranscriptEntry>,
        turn: u32,
        side: Side,
        fraction: Fraction,
        reason: AbstentionReason,
    ) {
        self.record(
            slots,
            turn,
            side,
            TranscriptEntry::Abstention(Abstention { fraction, reason }),
        );
    }

    fn record(
        &self,
        slots: &mut BTreeMap<Fraction, TranscriptEntry>,
        turn: u32,
        side: Side,
        entry: TranscriptEntry,
    ) {
        let event = match &entry {
            TranscriptEntry::Proposal(p) => {
                debug!(side = %side, fraction = %p.fraction, mv = %p.mv, "proposal received");
                GameEvent::ProposalReceived {
                    turn,
                    side,
                    fraction: p.fraction,
                    mv: p.mv.clone(),
                    justification: p.justification.clone(),
                }
            }
            TranscriptEntry::Abstention(a) => {
                if !a.reason.is_not_invited() {
                    warn!(side = %side, fraction = %a.fraction, reason = %a.reason, "fraction abstained");
                }
                GameEvent::FractionAbstained {
                    turn,
                    side,
                    fraction: a.fraction,
                    reason: a.reason.clone(),
                }
            }
        };
        self.publish(event);
        slots.insert(entry.fraction(), entry);
    }

    fn publish(&self, event: GameEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

impl Default for DebateOrchestrator {
    fn default() -> Self {
        Self::new(DebateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{MockFractionAgent, RoyalReply};
    use crate::rules::StandardChess;

    #[tokio::test]
    async fn test_king_endorsement_is_played() {
        let mut mock = MockFractionAgent::new();
        mock.expect_propose().returning(|request| {
            Ok(ProposalReply {
                mv: request.legal_moves[0].clone(),
                justification: format!("{} first choice", request.fraction),
            })
        });
        mock.expect_decide().times(1).returning(|request| {
            let knight = request
                .proposals
                .iter()
                .find(|p| p.fraction == Fraction::Knight)
                .map(|p| p.mv.clone())
                .unwrap_or_else(|| Move::from("none"));
            Ok(RoyalReply {
                mv: knight,
                reasoning: "develop".to_string(),
            })
        });
        mock.expect_suggest_update().never();
        let agent: SharedAgent = Arc::new(mock);

        let rules = StandardChess::new();
        let start = rules.initial_position();
        let outcome = DebateOrchestrator::default()
            .decide_move(&rules, &start, 0, &PromptStore::default(), &agent)
            .await
            .unwrap();

        assert_eq!(outcome.mv, Move::from("b1a3"));
        assert_eq!(
            outcome.transcript.selection().source,
            SelectionSource::Royal {
                fraction: Fraction::Knight
            }
        );
        assert_eq!(outcome.transcript.entries().len(), 5);
        assert_eq!(outcome.transcript.proposals().count(), 2);
    }

    #[tokio::test]
    async fn test_agent_errors_become_abstentions() {
        let mut mock = MockFractionAgent::new();
        mock.expect_propose()
            .returning(|_| Err(AgentError::Unavailable("offline".to_string())));
        mock.expect_decide().never();
        let agent: SharedAgent = Arc::new(mock);

        let rules = StandardChess::new();
        let start = rules.initial_position();
        let outcome = DebateOrchestrator::default()
            .decide_move(&rules, &start, 0, &PromptStore::default(), &agent)
            .await
            .unwrap();

        assert_eq!(outcome.mv, Move::from("a2a3"));
        assert_eq!(outcome.transcript.royal(), &RoyalOutcome::Skipped);
        assert!(matches!(
            outcome.transcript.abstention_for(Fraction::Pawn),
            Some(AbstentionReason::AgentError { .. })
        ));
    }

    #[test]
    fn test_worst_case_latency_is_deadline_plus_royal_budget() {
        let config = DebateConfig {
            proposal_timeout_ms: 100,
            round_deadline_ms: 150,
            royal_timeout_ms: 80,
        };
        assert_eq!(config.worst_case(), Duration::from_millis(230));
    }
}
