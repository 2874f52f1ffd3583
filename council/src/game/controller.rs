//! Turn controller.
//!
//! Owns the game state and sequences one turn at a time: quota reset,
//! optional directive update, debate, move application, status and side
//! flip. `advance_turn` takes `&mut self`, so turns never overlap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use super::replay::{replay, GameRecord, RecordedMove};
use super::state::{GameState, GameStatus, MoveRecord, Scoreboard, TerminalReason};
use crate::agent::{SharedAgent, UpdateRequest};
use crate::config::{ConfigError, GameConfig};
use crate::debate::{DebateError, DebateOrchestrator, SelectionSource, Transcript};
use crate::directive::{DirectiveError, PromptStore, UpdateRecord};
use crate::events::{GameEvent, SharedEventBus};
use crate::fraction::{Fraction, Side};
use crate::rules::{Move, RulesEngine, RulesError};

/// Material advantage is reported within this bound.
const EVALUATION_BOUND: i32 = 10;

/// The agent capability used by each side.
#[derive(Clone)]
pub struct SideAgents {
    white: SharedAgent,
    black: SharedAgent,
}

impl SideAgents {
    pub fn new(white: SharedAgent, black: SharedAgent) -> Self {
        Self { white, black }
    }

    /// Both sides share one agent.
    pub fn shared(agent: SharedAgent) -> Self {
        Self {
            white: Arc::clone(&agent),
            black: agent,
        }
    }

    pub fn for_side(&self, side: Side) -> &SharedAgent {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

/// What became of the side's directive update this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The side already spent its quota before the turn started.
    QuotaSpent,
    /// The agent chose not to change anything.
    Declined,
    Applied(UpdateRecord),
    Rejected {
        fraction: Fraction,
        error: DirectiveError,
    },
    TimedOut {
        budget_ms: u64,
    },
    Failed {
        message: String,
    },
}

/// Summary of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn: u32,
    pub side: Side,
    pub update: UpdateOutcome,
    pub mv: Move,
    pub source: SelectionSource,
    pub status: GameStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("game is over: {0}")]
    GameOver(GameStatus),

    #[error("directives can only be seeded before the first move")]
    AlreadyStarted,

    #[error(transparent)]
    Debate(#[from] DebateError),

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Directive(#[from] DirectiveError),
}

pub struct GameController<R: RulesEngine> {
    id: Uuid,
    created_at: DateTime<Utc>,
    rules: R,
    config: GameConfig,
    agents: SideAgents,
    orchestrator: DebateOrchestrator,
    events: Option<SharedEventBus>,
    state: GameState<R::Position>,
}

impl<R: RulesEngine> GameController<R> {
    /// Start a new game at the rules engine's initial position.
    pub fn new(rules: R, config: GameConfig, agents: SideAgents) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = PromptStore::from_config(&config.directives)
            .map_err(|e| ConfigError::Invalid(format!("blocked phrase: {}", e)))?;
        let state = GameState::new(&rules, store);
        let orchestrator = DebateOrchestrator::new(config.debate.clone());
        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            rules,
            config,
            agents,
            orchestrator,
            events: None,
            state,
        })
    }

    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.orchestrator = DebateOrchestrator::new(self.config.debate.clone())
            .with_events(Arc::clone(&events));
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Set a side's opening directive for all of its fractions.
    pub fn seed_directive(&mut self, side: Side, text: &str) -> Result<(), GameError> {
        if !self.state.history.is_empty() {
            return Err(GameError::AlreadyStarted);
        }
        self.state.directives.seed_side(side, text)?;
        Ok(())
    }

    /// Change one directive between turns. Counts against the quota of
    /// the turn about to be played.
    pub fn submit_directive_update(
        &mut self,
        side: Side,
        fraction: Fraction,
        text: &str,
        rationale: &str,
    ) -> Result<UpdateRecord, GameError> {
        if self.state.status.is_terminal() {
            return Err(GameError::GameOver(self.state.status));
        }
        let turn = self.state.turn;
        self.state.directives.begin_turn(turn);
        match self.state.directives.update(side, fraction, text, rationale) {
            Ok(record) => {
                self.publish(GameEvent::DirectiveUpdated {
                    turn,
                    side,
                    fraction,
                    directive: record.new.clone(),
                });
                Ok(record)
            }
            Err(e) => {
                self.publish(GameEvent::directive_rejected(turn, side, fraction, &e));
                Err(e.into())
            }
        }
    }

    /// Play one turn for the side to move.
    pub async fn advance_turn(&mut self) -> Result<TurnReport, GameError> {
        if self.state.status.is_terminal() {
            return Err(GameError::GameOver(self.state.status));
        }
        let turn = self.state.turn;
        let side = self.state.side_to_move;
        info!(turn, side = %side, "turn started");
        self.publish(GameEvent::TurnStarted { turn, side });

        self.state.directives.begin_turn(turn);
        let update = self.request_update(side, turn).await;

        let agent = Arc::clone(self.agents.for_side(side));
        let outcome = self
            .orchestrator
            .decide_move(
                &self.rules,
                &self.state.position,
                turn,
                &self.state.directives,
                &agent,
            )
            .await?;

        let opponent = side.opponent();
        let before = self.rules.material(&self.state.position, opponent);
        let next = self.rules.apply(&self.state.position, &outcome.mv)?;
        let captured = before.saturating_sub(self.rules.material(&next, opponent));
        self.state.scoreboard.record_move(side, captured);

        let source = outcome.transcript.selection().source;
        self.state.history.push(MoveRecord {
            side,
            mv: outcome.mv.clone(),
            position: next.clone(),
            turn,
        });
        self.state.transcripts.push(outcome.transcript);
        self.state.position = next;

        let side_to_move = self.rules.side_to_move(&self.state.position);
        let mut status = GameStatus::from_board(self.rules.status(&self.state.position), side_to_move);
        if !status.is_terminal() && turn + 1 >= self.config.max_turns {
            status = GameStatus::Terminal(TerminalReason::MaxTurnsReached);
        }
        self.state.status = status;
        self.state.side_to_move = side_to_move;
        self.state.turn = turn + 1;

        info!(turn, side = %side, mv = %outcome.mv, captured, status = %status, "move applied");
        self.publish(GameEvent::MoveApplied {
            turn,
            side,
            mv: outcome.mv.clone(),
            board: self.rules.snapshot(&self.state.position).board,
        });
        if status.is_terminal() {
            info!(turns = self.state.turn, status = %status, "game ended");
            self.publish(GameEvent::GameEnded {
                turn: self.state.turn,
                status,
            });
        }

        Ok(TurnReport {
            turn,
            side,
            update,
            mv: outcome.mv,
            source,
            status,
        })
    }

    /// Advance until the game reaches a terminal status.
    pub async fn play_to_end(&mut self) -> Result<GameStatus, GameError> {
        while !self.state.status.is_terminal() {
            self.advance_turn().await?;
        }
        Ok(self.state.status)
    }

    async fn request_update(&mut self, side: Side, turn: u32) -> UpdateOutcome {
        if self.state.directives.has_updated(side) {
            return UpdateOutcome::QuotaSpent;
        }
        let position = &self.state.position;
        let request = UpdateRequest {
            side,
            turn,
            snapshot: self.rules.snapshot(position),
            own: self.state.directives.directives_for(side),
            opponent: self.state.directives.directives_for(side.opponent()),
            active: self.rules.active_fractions(position, side),
        };
        let agent = Arc::clone(self.agents.for_side(side));
        let budget_ms = self.config.update_timeout_ms;

        match timeout(self.config.update_timeout(), agent.suggest_update(request)).await {
            Err(_) => {
                warn!(side = %side, budget_ms, "directive update timed out");
                UpdateOutcome::TimedOut { budget_ms }
            }
            Ok(Err(e)) => {
                warn!(side = %side, error = %e, "directive update failed");
                UpdateOutcome::Failed {
                    message: e.to_string(),
                }
            }
            Ok(Ok(None)) => UpdateOutcome::Declined,
            Ok(Ok(Some(update))) => {
                match self.state.directives.update(
                    side,
                    update.fraction,
                    &update.directive,
                    &update.rationale,
                ) {
                    Ok(record) => {
                        self.publish(GameEvent::DirectiveUpdated {
                            turn,
                            side,
                            fraction: update.fraction,
                            directive: record.new.clone(),
                        });
                        UpdateOutcome::Applied(record)
                    }
                    Err(error) => {
                        warn!(side = %side, fraction = %update.fraction, error = %error, "directive update rejected");
                        self.publish(GameEvent::directive_rejected(turn, side, update.fraction, &error));
                        UpdateOutcome::Rejected {
                            fraction: update.fraction,
                            error,
                        }
                    }
                }
            }
        }
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    pub fn turn(&self) -> u32 {
        self.state.turn
    }

    pub fn side_to_move(&self) -> Side {
        self.state.side_to_move
    }

    pub fn position(&self) -> &R::Position {
        &self.state.position
    }

    pub fn history(&self) -> &[MoveRecord<R::Position>] {
        &self.state.history
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.state.transcripts
    }

    pub fn directives(&self) -> &PromptStore {
        &self.state.directives
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.state.scoreboard
    }

    pub fn state(&self) -> &GameState<R::Position> {
        &self.state
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Material balance clamped to [-10, 10], positive when White leads.
    pub fn evaluation(&self) -> i32 {
        let white = self.rules.material(&self.state.position, Side::White) as i32;
        let black = self.rules.material(&self.state.position, Side::Black) as i32;
        (white - black).clamp(-EVALUATION_BOUND, EVALUATION_BOUND)
    }

    /// Check that replaying the history reproduces the current position.
    pub fn verify_replay(&self) -> Result<bool, RulesError> {
        let moves = self.state.history.iter().map(|record| &record.mv);
        let replayed = replay(&self.rules, &self.state.initial, moves)?;
        Ok(replayed == self.state.position)
    }

    /// Export the game for persistence.
    pub fn record(&self) -> GameRecord {
        GameRecord {
            version: GameRecord::CURRENT_VERSION,
            id: self.id,
            created_at: self.created_at,
            max_turns: self.config.max_turns,
            initial: self.rules.snapshot(&self.state.initial),
            moves: self
                .state
                .history
                .iter()
                .map(|record| RecordedMove {
                    turn: record.turn,
                    side: record.side,
                    mv: record.mv.clone(),
                    position: self.rules.snapshot(&record.position).key,
                })
                .collect(),
            transcripts: self.state.transcripts.clone(),
            directive_log: self.state.directives.audit_log().to_vec(),
            scoreboard: self.state.scoreboard,
            status: self.state.status,
        }
    }

    fn publish(&self, event: GameEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
