//! Scripted agents for council integration tests (no LLM calls).

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use council::{
    AgentError, DebateConfig, Fraction, FractionAgent, GameConfig, PromptUpdate, ProposalReply,
    ProposalRequest, RoyalReply, RoyalRequest, SharedAgent, UpdateRequest,
};

/// Scripted proposal behaviour.
#[derive(Debug, Clone)]
pub enum Reply {
    Move(&'static str),
    /// First move of the fraction's legal subset.
    FirstLegal,
    Error,
    /// Never answers.
    Hang,
    /// Answer after a delay.
    Slow(u64, &'static str),
    /// The proposal task panics with this message.
    Panic(&'static str),
}

/// Scripted royal behaviour.
#[derive(Debug, Clone)]
pub enum Royal {
    Pick(&'static str),
    FirstProposal,
    Error,
    Hang,
}

/// Agent that replays per-fraction scripts, then falls back to defaults.
pub struct ScriptedAgent {
    proposals: Mutex<HashMap<Fraction, VecDeque<Reply>>>,
    default_reply: Reply,
    royal: Mutex<VecDeque<Royal>>,
    default_royal: Royal,
    updates: Mutex<VecDeque<Option<PromptUpdate>>>,
    pub proposal_requests: Mutex<Vec<ProposalRequest>>,
    pub royal_requests: Mutex<Vec<RoyalRequest>>,
    pub update_requests: Mutex<Vec<UpdateRequest>>,
}

impl ScriptedAgent {
    pub fn new(default_reply: Reply, default_royal: Royal) -> Self {
        Self {
            proposals: Mutex::new(HashMap::new()),
            default_reply,
            royal: Mutex::new(VecDeque::new()),
            default_royal,
            updates: Mutex::new(VecDeque::new()),
            proposal_requests: Mutex::new(Vec::new()),
            royal_requests: Mutex::new(Vec::new()),
            update_requests: Mutex::new(Vec::new()),
        }
    }

    /// Every proposal and royal call fails.
    pub fn failing() -> Self {
        Self::new(Reply::Error, Royal::Error)
    }

    pub fn script(self, fraction: Fraction, reply: Reply) -> Self {
        self.proposals
            .lock()
            .unwrap()
            .entry(fraction)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn royal(self, royal: Royal) -> Self {
        self.royal.lock().unwrap().push_back(royal);
        self
    }

    pub fn update(self, update: Option<PromptUpdate>) -> Self {
        self.updates.lock().unwrap().push_back(update);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn proposal_count(&self) -> usize {
        self.proposal_requests.lock().unwrap().len()
    }

    pub fn royal_count(&self) -> usize {
        self.royal_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl FractionAgent for ScriptedAgent {
    async fn propose(&self, request: ProposalRequest) -> Result<ProposalReply, AgentError> {
        let reply = self
            .proposals
            .lock()
            .unwrap()
            .get_mut(&request.fraction)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| self.default_reply.clone());
        self.proposal_requests.lock().unwrap().push(request.clone());

        let mv = match reply {
            Reply::Move(mv) => mv.into(),
            Reply::FirstLegal => request.legal_moves[0].clone(),
            Reply::Error => {
                return Err(AgentError::Communication(format!(
                    "{} endpoint refused",
                    request.fraction
                )))
            }
            Reply::Hang => return std::future::pending().await,
            Reply::Slow(ms, mv) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                mv.into()
            }
            Reply::Panic(message) => panic!("{}", message),
        };
        Ok(ProposalReply {
            mv,
            justification: format!("{} says so", request.fraction.title()),
        })
    }

    async fn decide(&self, request: RoyalRequest) -> Result<RoyalReply, AgentError> {
        let royal = self
            .royal
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_royal.clone());
        self.royal_requests.lock().unwrap().push(request.clone());

        let mv = match royal {
            Royal::Pick(mv) => mv.into(),
            Royal::FirstProposal => request.proposals[0].mv.clone(),
            Royal::Error => return Err(AgentError::Unavailable("king is asleep".to_string())),
            Royal::Hang => return std::future::pending().await,
        };
        Ok(RoyalReply {
            mv,
            reasoning: "So be it.".to_string(),
        })
    }

    async fn suggest_update(
        &self,
        request: UpdateRequest,
    ) -> Result<Option<PromptUpdate>, AgentError> {
        self.update_requests.lock().unwrap().push(request);
        Ok(self.updates.lock().unwrap().pop_front().flatten())
    }
}

/// Agent that proposes pseudo-random moves, legal or not, and names
/// arbitrary royal choices. Deterministic for a given seed.
pub struct ChaosAgent {
    state: AtomicU64,
}

impl ChaosAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            state: AtomicU64::new(seed.max(1)),
        }
    }

    fn next(&self) -> u64 {
        let mut x = self.state.load(Ordering::Relaxed);
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.store(x, Ordering::Relaxed);
        x
    }
}

#[async_trait]
impl FractionAgent for ChaosAgent {
    async fn propose(&self, request: ProposalRequest) -> Result<ProposalReply, AgentError> {
        let roll = self.next();
        let mv = match roll % 4 {
            0 => return Err(AgentError::Parse("garbled".to_string())),
            1 => "z9z9".into(),
            _ => request.legal_moves[(roll as usize / 4) % request.legal_moves.len()].clone(),
        };
        Ok(ProposalReply {
            mv,
            justification: String::new(),
        })
    }

    async fn decide(&self, request: RoyalRequest) -> Result<RoyalReply, AgentError> {
        let roll = self.next();
        let mv = match roll % 3 {
            0 => "a1a1".into(),
            1 => return Err(AgentError::Communication("lost".to_string())),
            _ => request.proposals[(roll as usize / 3) % request.proposals.len()]
                .mv
                .clone(),
        };
        Ok(RoyalReply {
            mv,
            reasoning: String::new(),
        })
    }

    async fn suggest_update(
        &self,
        _request: UpdateRequest,
    ) -> Result<Option<PromptUpdate>, AgentError> {
        Ok(None)
    }
}

pub fn shared(agent: ScriptedAgent) -> (Arc<ScriptedAgent>, SharedAgent) {
    let agent = agent.shared();
    let dyn_agent: SharedAgent = agent.clone();
    (agent, dyn_agent)
}

/// Debate budgets small enough for paused-clock tests.
pub fn fast_debate() -> DebateConfig {
    DebateConfig {
        proposal_timeout_ms: 100,
        round_deadline_ms: 150,
        royal_timeout_ms: 80,
    }
}

pub fn fast_config(max_turns: u32) -> GameConfig {
    GameConfig {
        max_turns,
        debate: fast_debate(),
        update_timeout_ms: 100,
        ..GameConfig::default()
    }
}

pub fn update(fraction: Fraction, directive: &str) -> PromptUpdate {
    PromptUpdate {
        fraction,
        directive: directive.to_string(),
        rationale: "scripted".to_string(),
    }
}

/// Route council logs to the test output; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
