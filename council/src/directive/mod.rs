//! Fraction prompt store.
//!
//! Holds the current directive of every `(side, fraction)` pair, enforces
//! the one-accepted-update-per-side-per-turn quota and keeps an audit log
//! of every accepted change. The log is separate from the move history.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DirectiveConfig;
use crate::fraction::{Fraction, Side};

/// Why a directive text was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidReason {
    Empty,
    TooLong { len: usize, max: usize },
    Blocked { phrase: String },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "directive is empty"),
            Self::TooLong { len, max } => {
                write!(f, "directive is {} characters, limit is {}", len, max)
            }
            Self::Blocked { phrase } => write!(f, "directive contains blocked phrase '{}'", phrase),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("invalid directive for {side} {fraction}: {reason}")]
    InvalidDirective {
        side: Side,
        fraction: Fraction,
        reason: InvalidReason,
    },

    #[error("{side} already updated a directive on turn {turn}")]
    UpdateQuotaExceeded { side: Side, turn: u32 },
}

/// One accepted directive change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub side: Side,
    pub fraction: Fraction,
    pub old: String,
    pub new: String,
    pub rationale: String,
    pub turn: u32,
    pub at: DateTime<Utc>,
}

/// Validation rules applied to every directive text.
#[derive(Debug, Clone)]
pub struct DirectivePolicy {
    max_chars: usize,
    blocked: Vec<(String, Regex)>,
}

impl DirectivePolicy {
    /// Build a policy. Blocked phrases match case-insensitively with any
    /// run of whitespace between their words.
    pub fn new(max_chars: usize, blocked_phrases: &[String]) -> Result<Self, regex::Error> {
        let blocked = blocked_phrases
            .iter()
            .filter(|phrase| !phrase.trim().is_empty())
            .map(|phrase| {
                let pattern = phrase
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+");
                RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (phrase.clone(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { max_chars, blocked })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn check(&self, text: &str) -> Result<(), InvalidReason> {
        if text.trim().is_empty() {
            return Err(InvalidReason::Empty);
        }
        let len = text.chars().count();
        if len > self.max_chars {
            return Err(InvalidReason::TooLong {
                len,
                max: self.max_chars,
            });
        }
        if let Some((phrase, _)) = self.blocked.iter().find(|(_, re)| re.is_match(text)) {
            return Err(InvalidReason::Blocked {
                phrase: phrase.clone(),
            });
        }
        Ok(())
    }
}

impl Default for DirectivePolicy {
    fn default() -> Self {
        Self {
            max_chars: 500,
            blocked: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptStore {
    policy: DirectivePolicy,
    defaults: BTreeMap<Fraction, String>,
    fallback_text: String,
    directives: BTreeMap<(Side, Fraction), String>,
    turn: u32,
    updated_this_turn: BTreeSet<Side>,
    log: Vec<UpdateRecord>,
}

impl PromptStore {
    /// Fresh store for a new game. Every pair reads its default until set.
    pub fn new(
        policy: DirectivePolicy,
        defaults: BTreeMap<Fraction, String>,
        fallback_text: impl Into<String>,
    ) -> Self {
        Self {
            policy,
            defaults,
            fallback_text: fallback_text.into(),
            directives: BTreeMap::new(),
            turn: 0,
            updated_this_turn: BTreeSet::new(),
            log: Vec::new(),
        }
    }

    /// Build a store from configuration.
    pub fn from_config(config: &DirectiveConfig) -> Result<Self, regex::Error> {
        let policy = DirectivePolicy::new(config.max_chars, &config.blocked_phrases)?;
        let mut defaults = BTreeMap::new();
        for (name, text) in &config.defaults {
            if let Ok(fraction) = name.parse::<Fraction>() {
                defaults.insert(fraction, text.clone());
            }
        }
        Ok(Self::new(policy, defaults, config.default_text.clone()))
    }

    /// Install a side's opening directive for every fraction.
    ///
    /// Seeding happens before the game starts, so it neither consumes the
    /// quota nor appears in the audit log.
    pub fn seed_side(&mut self, side: Side, text: &str) -> Result<(), DirectiveError> {
        self.policy
            .check(text)
            .map_err(|reason| DirectiveError::InvalidDirective {
                side,
                fraction: Fraction::Pawn,
                reason,
            })?;
        for fraction in Fraction::ALL {
            self.directives.insert((side, fraction), text.to_string());
        }
        debug!(side = %side, "directives seeded");
        Ok(())
    }

    /// Current directive text, the configured default if never set.
    pub fn get(&self, side: Side, fraction: Fraction) -> &str {
        self.directives
            .get(&(side, fraction))
            .or_else(|| self.defaults.get(&fraction))
            .map(String::as_str)
            .unwrap_or(self.fallback_text.as_str())
    }

    pub fn update(
        &mut self,
        side: Side,
        fraction: Fraction,
        new_text: &str,
        rationale: &str,
    ) -> Result<UpdateRecord, DirectiveError> {
        self.policy
            .check(new_text)
            .map_err(|reason| DirectiveError::InvalidDirective {
                side,
                fraction,
                reason,
            })?;
        if self.updated_this_turn.contains(&side) {
            return Err(DirectiveError::UpdateQuotaExceeded {
                side,
                turn: self.turn,
            });
        }

        let old = self.get(side, fraction).to_string();
        self.directives
            .insert((side, fraction), new_text.to_string());
        self.updated_this_turn.insert(side);

        let record = UpdateRecord {
            side,
            fraction,
            old,
            new: new_text.to_string(),
            rationale: rationale.to_string(),
            turn: self.turn,
            at: Utc::now(),
        };
        self.log.push(record.clone());
        info!(side = %side, fraction = %fraction, turn = self.turn, "directive updated");
        Ok(record)
    }

    /// Open the quota window for `turn`. Calling it again for the same
    /// turn keeps updates already accepted in that turn.
    pub fn begin_turn(&mut self, turn: u32) {
        if turn != self.turn {
            self.turn = turn;
            self.updated_this_turn.clear();
        }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn has_updated(&self, side: Side) -> bool {
        self.updated_this_turn.contains(&side)
    }

    /// All five directives of one side.
    pub fn directives_for(&self, side: Side) -> BTreeMap<Fraction, String> {
        Fraction::ALL
            .into_iter()
            .map(|fraction| (fraction, self.get(side, fraction).to_string()))
            .collect()
    }

    pub fn audit_log(&self) -> &[UpdateRecord] {
        &self.log
    }

    pub fn policy(&self) -> &DirectivePolicy {
        &self.policy
    }
}

impl Default for PromptStore {
    fn default() -> Self {
        Self::new(DirectivePolicy::default(), BTreeMap::new(), "")
    }
}
