//! Anthropic API client for the generation capability
//!
//! Each call is completely stateless: no conversation history is kept, the
//! role instruction set plus the user payload is the whole context. The
//! workflow engine never retries a failed stage, so transport-level retries
//! on 429/5xx live here and are configurable (zero disables them).

use crate::auth;
use crate::types::{
    AnthropicMessage, AnthropicRequest, AnthropicResponse, AnthropicTool, GenerationRequest,
    GenerationResult, Model,
};
use async_trait::async_trait;
use chrono::Utc;
use foreman_core::{ForemanConfig, ForemanError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const INITIAL_BACKOFF_SECS: u64 = 10;
const MAX_BACKOFF_SECS: u64 = 120;

/// Trait for the generation capability (allows mocking in tests)
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a response for the given instruction set and payload
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;
}

/// Client for the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_base: String,
    model: Model,
    api_key_env: String,
    max_retries: u32,
    auth_token: Option<String>,
}

impl AnthropicClient {
    /// Create a new client for the given model
    pub fn new(model: Model) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: ANTHROPIC_API_BASE.to_string(),
            model,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            max_retries: 3,
            auth_token: None,
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &ForemanConfig) -> Result<Self> {
        let model: Model = config
            .models
            .default
            .parse()
            .map_err(ForemanError::Other)?;

        Ok(Self::new(model)
            .with_api_key_env(&config.models.api_key_env)
            .with_max_retries(config.generation.max_retries))
    }

    /// Override the API base URL (enterprise gateways, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Environment variable to read the API key from
    pub fn with_api_key_env(mut self, env: impl Into<String>) -> Self {
        self.api_key_env = env.into();
        self
    }

    /// Transport-level retry budget for 429/5xx responses
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Supply the auth token directly instead of reading the environment
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn auth_token(&self) -> Result<String> {
        match &self.auth_token {
            Some(token) => Ok(token.clone()),
            None => auth::get_auth_token(&self.api_key_env),
        }
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let auth_token = self.auth_token()?;

        let wire_request = AnthropicRequest {
            model: self.model.api_name().to_string(),
            max_tokens: request.max_tokens,
            system: if request.system.is_empty() {
                None
            } else {
                Some(request.system.clone())
            },
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            tools: if request.enable_search {
                Some(vec![AnthropicTool::web_search()])
            } else {
                None
            },
        };

        let url = format!("{}{}", self.api_base, MESSAGES_PATH);
        let mut retries = 0;
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            tracing::debug!("Sending generation request (attempt {})", retries + 1);

            let response = self
                .http
                .post(&url)
                .header("x-api-key", &auth_token)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&wire_request)
                .send()
                .await
                .map_err(|e| ForemanError::Api(format!("Failed to send request: {}", e)))?;

            let status = response.status();

            // Rate limit: honor retry-after, otherwise exponential backoff
            if status.as_u16() == 429 {
                retries += 1;

                if retries > self.max_retries {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown".to_string());
                    return Err(ForemanError::ApiLimit(format!(
                        "Rate limit exceeded after {} retries. Last error: {}",
                        self.max_retries, error_text
                    )));
                }

                let wait_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(backoff_secs);

                tracing::warn!(
                    "Rate limited (429). Waiting {} seconds before retry {}/{}",
                    wait_secs,
                    retries,
                    self.max_retries
                );

                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown".to_string());

                if status.is_server_error() && retries < self.max_retries {
                    retries += 1;
                    tracing::warn!(
                        "Server error ({}). Waiting {} seconds before retry {}/{}",
                        status,
                        backoff_secs,
                        retries,
                        self.max_retries
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                return Err(ForemanError::Api(format!(
                    "Anthropic API error {}: {}",
                    status, error_text
                )));
            }

            let anthropic_response: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| ForemanError::Api(format!("Failed to parse response: {}", e)))?;

            let text = anthropic_response.flattened_text();
            if text.is_empty() {
                return Err(ForemanError::Api("No text content in response".to_string()));
            }

            if let Some(ref usage) = anthropic_response.usage {
                tracing::info!(
                    "Generation complete ({} chars, {} input tokens, {} output tokens)",
                    text.len(),
                    usage.input_tokens,
                    usage.output_tokens
                );
            } else {
                tracing::info!("Generation complete ({} chars)", text.len());
            }

            return Ok(GenerationResult {
                text,
                timestamp: Utc::now(),
                usage: anthropic_response.usage,
            });
        }
    }
}

/// Mock generation client for testing
///
/// Responses are consumed in FIFO order; when the queue is empty a canned
/// response is returned. Every request is recorded for assertions.
#[derive(Clone, Default)]
pub struct MockGenerationClient {
    responses: Arc<Mutex<VecDeque<Result<String>>>>,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a failure
    pub fn push_error(&self, error: ForemanError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// All requests seen so far, in call order
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.calls.lock().unwrap().push(request.clone());

        let next = self.responses.lock().unwrap().pop_front();
        let text = match next {
            Some(result) => result?,
            None => "mock response".to_string(),
        };

        Ok(GenerationResult {
            text,
            timestamp: Utc::now(),
            usage: None,
        })
    }
}
