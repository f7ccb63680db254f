use crate::http::build_client_with_timeout;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Generous budget: the hosted model behind this gateway is large and slow.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let timeout = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "https://ollama.com".into()),
            api_key: std::env::var("OLLAMA_API_KEY").ok(),
            model: std::env::var("OLLAMA_MODEL").ok(),
            timeout: Duration::from_secs(timeout),
        }
    }
}

/// The single error kind the gateway ever surfaces. Whatever actually went
/// wrong upstream is logged internally and never leaks to the caller.
#[derive(Debug, Error)]
#[error("Asistente no disponible. Intenta más tarde.")]
pub struct AssistantUnavailable;

/// Internal failure taxonomy, for operator logs only.
#[derive(Debug, Error)]
enum GatewayFailure {
    #[error("OLLAMA_API_KEY no configurada")]
    MissingApiKey,
    #[error("OLLAMA_MODEL no configurado")]
    MissingModel,
    #[error("http error: {0}")]
    Http(String),
    #[error("empty model response")]
    EmptyResponse,
}

pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: build_client_with_timeout(config.timeout),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(LlmConfig::from_env())
    }

    /// Send one composed prompt and extract the textual answer.
    pub async fn generate(&self, prompt: &str) -> Result<String, AssistantUnavailable> {
        match self.try_generate(prompt).await {
            Ok(answer) => Ok(answer),
            Err(cause) => {
                warn!(target = "srbot.llm", error = %cause, "model gateway failure");
                Err(AssistantUnavailable)
            }
        }
    }

    async fn try_generate(&self, prompt: &str) -> Result<String, GatewayFailure> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GatewayFailure::MissingApiKey)?;
        let model = self
            .config
            .model
            .as_deref()
            .ok_or(GatewayFailure::MissingModel)?;

        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.7,
                num_predict: 500,
            },
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayFailure::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayFailure::Http(format!("HTTP {}", response.status())));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|err| GatewayFailure::Http(err.to_string()))?;

        let answer = payload.response.trim();
        if answer.is_empty() {
            return Err(GatewayFailure::EmptyResponse);
        }
        Ok(answer.to_string())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
