//! LLM-backed agents for Prompt Chess.
//!
//! Implements the council's [`council::FractionAgent`] capability on top
//! of any OpenAI-compatible endpoint via rig.

pub mod agents;
pub mod config;
pub mod parse;
pub mod prompts;

pub use agents::LlmCouncil;
pub use config::{check_endpoint, ModelSet, ProviderConfig};
