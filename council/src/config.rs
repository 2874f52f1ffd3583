//! Game configuration.
//!
//! Defaults are usable as-is. A TOML file may override any subset of the
//! fields, and `PROMPTCHESS_*` environment variables override the file.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::debate::DebateConfig;
use crate::fraction::Fraction;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Directive store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectiveConfig {
    /// Upper bound on directive length, in characters.
    pub max_chars: usize,
    /// Directive of any fraction without a specific default.
    pub default_text: String,
    /// Per-fraction defaults keyed by fraction name.
    pub defaults: BTreeMap<String, String>,
    /// Phrases refused in directive updates, matched case-insensitively.
    pub blocked_phrases: Vec<String>,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        let defaults = [
            (Fraction::Pawn, "Advance steadily, claim the centre and support your neighbours."),
            (Fraction::Knight, "Seek strong outposts and forks against the enemy's valuable pieces."),
            (Fraction::Bishop, "Control long diagonals and pin enemy pieces to their king."),
            (Fraction::Rook, "Take open files and reach the seventh rank."),
            (Fraction::Queen, "Strike where the enemy is weakest while staying out of danger."),
        ]
        .into_iter()
        .map(|(fraction, text)| (fraction.name().to_string(), text.to_string()))
        .collect();

        Self {
            max_chars: 500,
            default_text: "Play sound, principled chess for the good of the realm.".to_string(),
            defaults,
            blocked_phrases: vec![
                "ignore previous instructions".to_string(),
                "ignore all previous instructions".to_string(),
                "disregard the king".to_string(),
                "system prompt".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Turn cap. Reaching it ends the game as `MaxTurnsReached`.
    pub max_turns: u32,
    pub debate: DebateConfig,
    /// Budget of the strategist's directive-update call.
    pub update_timeout_ms: u64,
    pub directives: DirectiveConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_turns: 100,
            debate: DebateConfig::default(),
            update_timeout_ms: 30_000,
            directives: DirectiveConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl GameConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a TOML file, apply env overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?.with_env_overrides();
        config.validate()?;
        debug!(path = %path.display(), "game config loaded");
        Ok(config)
    }

    /// Apply `PROMPTCHESS_*` overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u32>("PROMPTCHESS_MAX_TURNS").filter(|v| *v > 0) {
            self.max_turns = v;
        }
        if let Some(v) = env_parse("PROMPTCHESS_PROPOSAL_TIMEOUT_MS") {
            self.debate.proposal_timeout_ms = v;
        }
        if let Some(v) = env_parse("PROMPTCHESS_ROUND_DEADLINE_MS") {
            self.debate.round_deadline_ms = v;
        }
        if let Some(v) = env_parse("PROMPTCHESS_ROYAL_TIMEOUT_MS") {
            self.debate.royal_timeout_ms = v;
        }
        if let Some(v) = env_parse("PROMPTCHESS_UPDATE_TIMEOUT_MS") {
            self.update_timeout_ms = v;
        }
        if let Some(v) = env_parse("PROMPTCHESS_MAX_DIRECTIVE_CHARS") {
            self.directives.max_chars = v;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be at least 1".into()));
        }
        let budgets = [
            ("debate.proposal_timeout_ms", self.debate.proposal_timeout_ms),
            ("debate.round_deadline_ms", self.debate.round_deadline_ms),
            ("debate.royal_timeout_ms", self.debate.royal_timeout_ms),
            ("update_timeout_ms", self.update_timeout_ms),
        ];
        if let Some((name, _)) = budgets.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("{} must be positive", name)));
        }
        if self.directives.max_chars == 0 {
            return Err(ConfigError::Invalid("directives.max_chars must be positive".into()));
        }
        let texts = std::iter::once(&self.directives.default_text)
            .chain(self.directives.defaults.values());
        for text in texts {
            if text.trim().is_empty() {
                return Err(ConfigError::Invalid("default directives must not be empty".into()));
            }
            if text.chars().count() > self.directives.max_chars {
                return Err(ConfigError::Invalid(format!(
                    "default directive exceeds {} characters",
                    self.directives.max_chars
                )));
            }
        }
        for name in self.directives.defaults.keys() {
            name.parse::<Fraction>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }
}
