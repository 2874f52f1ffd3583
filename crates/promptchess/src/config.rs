use anyhow::{Context, Result};
use rig::providers::openai;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Model names per agent role.
#[derive(Debug, Clone)]
pub struct ModelSet {
    /// Fraction commanders.
    pub fraction: String,
    /// Royal arbiter.
    pub king: String,
    /// Directive strategist.
    pub strategist: String,
}

/// OpenAI-compatible endpoint used by every agent.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub models: ModelSet,
    pub fraction_temperature: f64,
    pub king_temperature: f64,
}

fn temperature(var: &str, default: f64) -> f64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| (0.0..=2.0).contains(v))
        .unwrap_or(default)
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let model = std::env::var("PROMPTCHESS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Self {
            base_url: std::env::var("PROMPTCHESS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            api_key: std::env::var("PROMPTCHESS_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .unwrap_or_else(|_| "not-needed".into()),
            models: ModelSet {
                fraction: std::env::var("PROMPTCHESS_FRACTION_MODEL")
                    .unwrap_or_else(|_| model.clone()),
                king: std::env::var("PROMPTCHESS_KING_MODEL").unwrap_or_else(|_| model.clone()),
                strategist: std::env::var("PROMPTCHESS_STRATEGIST_MODEL")
                    .unwrap_or_else(|_| model.clone()),
            },
            fraction_temperature: temperature("PROMPTCHESS_FRACTION_TEMPERATURE", 0.7),
            king_temperature: temperature("PROMPTCHESS_KING_TEMPERATURE", 0.2),
        }
    }
}

impl ProviderConfig {
    pub fn client(&self) -> Result<openai::CompletionsClient> {
        openai::CompletionsClient::builder()
            .api_key(&self.api_key)
            .base_url(&self.base_url)
            .build()
            .with_context(|| format!("Failed to build client for {}", self.base_url))
    }
}

/// Check if an inference endpoint is reachable (GET /models).
pub async fn check_endpoint(url: &str, api_key: &str) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    match reqwest::Client::new()
        .get(&models_url)
        .bearer_auth(api_key)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
