//! LLM-backed fraction council.
//!
//! One [`LlmCouncil`] serves every role of a side: fraction commanders,
//! the king and the strategist. Each call builds a short-lived rig agent
//! with the role's preamble, sends one prompt and parses the reply.

use anyhow::Result;
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::debug;

use council::{
    AgentError, FractionAgent, PromptUpdate, ProposalReply, ProposalRequest, RoyalReply,
    RoyalRequest, UpdateRequest,
};

use crate::config::ProviderConfig;
use crate::parse::{parse_proposal, parse_royal, parse_update};
use crate::prompts::{self, KING_PREAMBLE, PROMPT_VERSION, STRATEGIST_PREAMBLE};

/// Sampling temperature of the strategist.
const STRATEGIST_TEMPERATURE: f64 = 0.3;

pub struct LlmCouncil {
    client: openai::CompletionsClient,
    config: ProviderConfig,
}

impl LlmCouncil {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = config.client()?;
        Ok(Self { client, config })
    }

    async fn ask(
        &self,
        model: &str,
        preamble: &str,
        temperature: f64,
        input: String,
    ) -> Result<String, AgentError> {
        let agent = self
            .client
            .agent(model)
            .preamble(preamble)
            .temperature(temperature)
            .build();
        agent
            .prompt(&input)
            .await
            .map_err(|e| AgentError::Communication(e.to_string()))
    }
}

#[async_trait]
impl FractionAgent for LlmCouncil {
    async fn propose(&self, request: ProposalRequest) -> Result<ProposalReply, AgentError> {
        let preamble =
            prompts::fraction_preamble(request.side, request.fraction, &request.directive);
        let input = prompts::proposal_input(&request);
        let raw = self
            .ask(
                &self.config.models.fraction,
                &preamble,
                self.config.fraction_temperature,
                input,
            )
            .await?;
        debug!(
            side = %request.side,
            fraction = %request.fraction,
            prompt_version = PROMPT_VERSION,
            reply = %raw,
            "fraction replied"
        );
        parse_proposal(&raw).map_err(|e| AgentError::Parse(e.to_string()))
    }

    async fn decide(&self, request: RoyalRequest) -> Result<RoyalReply, AgentError> {
        let input = prompts::royal_input(&request);
        let raw = self
            .ask(
                &self.config.models.king,
                KING_PREAMBLE,
                self.config.king_temperature,
                input,
            )
            .await?;
        debug!(side = %request.side, prompt_version = PROMPT_VERSION, reply = %raw, "king replied");
        parse_royal(&raw).map_err(|e| AgentError::Parse(e.to_string()))
    }

    async fn suggest_update(
        &self,
        request: UpdateRequest,
    ) -> Result<Option<PromptUpdate>, AgentError> {
        let input = prompts::update_input(&request);
        let raw = self
            .ask(
                &self.config.models.strategist,
                STRATEGIST_PREAMBLE,
                STRATEGIST_TEMPERATURE,
                input,
            )
            .await?;
        debug!(side = %request.side, prompt_version = PROMPT_VERSION, reply = %raw, "strategist replied");
        parse_update(&raw).map_err(|e| AgentError::Parse(e.to_string()))
    }
}
