//! Type definitions for generation capability interactions

use chrono::{DateTime, Utc};
use foreman_core::Usage;
use serde::{Deserialize, Serialize};

/// Claude model variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Opus,
    #[default]
    Sonnet,
    Haiku,
}

impl Model {
    /// Get the API model name
    pub fn api_name(&self) -> &'static str {
        match self {
            Model::Opus => "claude-opus-4-20250514",
            Model::Sonnet => "claude-sonnet-4-5-20250929",
            Model::Haiku => "claude-haiku-3-5-20250929",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::Opus => write!(f, "opus"),
            Model::Sonnet => write!(f, "sonnet"),
            Model::Haiku => write!(f, "haiku"),
        }
    }
}

impl std::str::FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opus" => Ok(Model::Opus),
            "sonnet" => Ok(Model::Sonnet),
            "haiku" => Ok(Model::Haiku),
            _ => Err(format!("Invalid model: {}. Use opus, sonnet, or haiku.", s)),
        }
    }
}

/// One generation request: a role-specific instruction set plus a user
/// payload, with an optional search capability and a token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Role-specific system instruction set
    pub system: String,
    /// User-level payload built from available inputs
    pub prompt: String,
    /// Token budget for the response
    pub max_tokens: usize,
    /// Whether the web search server tool is offered
    pub enable_search: bool,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens,
            enable_search: false,
        }
    }

    pub fn with_search(mut self) -> Self {
        self.enable_search = true;
        self
    }
}

/// Result of one generation call
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Concatenated text content from the response blocks
    pub text: String,
    /// When the response was received
    pub timestamp: DateTime<Utc>,
    /// Token usage if reported
    pub usage: Option<Usage>,
}

/// Anthropic API message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Server tool specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
}

impl AnthropicTool {
    pub fn web_search() -> Self {
        Self {
            tool_type: "web_search_20250305".to_string(),
            name: "web_search".to_string(),
        }
    }
}

/// Anthropic API request format
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
}

/// Anthropic API response format
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicResponse {
    #[allow(dead_code)]
    pub id: String,
    pub content: Vec<AnthropicContent>,
    pub usage: Option<Usage>,
}

/// Content block in an Anthropic response
///
/// Tool-use blocks carry no `text`, so responses are flattened by joining
/// the text of text-bearing blocks only.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl AnthropicResponse {
    /// Concatenate the text content of all text-bearing blocks
    pub fn flattened_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
