//! Configuration management for Foreman
//!
//! Loaded once at startup from `.foreman/config.toml` and read-only
//! afterwards. Every section has serde defaults so a missing file or a
//! partial file both work.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::Role;
use crate::Result;

/// Top-level Foreman configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForemanConfig {
    /// Model selection for the generation capability
    #[serde(default)]
    pub models: ModelConfig,

    /// Generation request policy (retries, token budgets)
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Hosting collaborator settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Completion watcher polling policy
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Handoff payload location
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Role instruction sets
    #[serde(default)]
    pub prompts: PromptConfig,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model to use
    #[serde(default = "default_model")]
    pub default: String,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Generation request policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Transport-level retries on 429/5xx. Zero disables retries entirely;
    /// the workflow itself never retries a failed stage.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Token budget for specification extraction
    #[serde(default = "default_specification_tokens")]
    pub specification_max_tokens: usize,

    /// Token budget for researcher output
    #[serde(default = "default_advisory_tokens")]
    pub researcher_max_tokens: usize,

    /// Token budget for security output
    #[serde(default = "default_advisory_tokens")]
    pub security_max_tokens: usize,

    /// Token budget for architect output
    #[serde(default = "default_architect_tokens")]
    pub architect_max_tokens: usize,

    /// Token budget for documenter output
    #[serde(default = "default_advisory_tokens")]
    pub documenter_max_tokens: usize,
}

impl GenerationConfig {
    /// Token budget for a given role
    pub fn budget_for(&self, role: Role) -> usize {
        match role {
            Role::Researcher => self.researcher_max_tokens,
            Role::Security => self.security_max_tokens,
            Role::Architect => self.architect_max_tokens,
            Role::Documenter => self.documenter_max_tokens,
        }
    }
}

/// Hosting collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// API base URL (overridable for enterprise installs and tests)
    #[serde(default = "default_github_api")]
    pub api_base: String,

    /// Default integration branch new work branches off
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Environment variable containing the access token
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
}

/// Completion watcher polling policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Initial interval between polls, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Cap for the backed-off poll interval, in seconds
    #[serde(default = "default_max_poll_interval_secs")]
    pub max_poll_interval_secs: u64,

    /// Total wait budget before giving up, in seconds
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl CompletionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_secs(self.max_poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Handoff payload location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Override for the payload path; defaults to
    /// `foreman_handoff.json` under the system temp dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl HandoffConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("foreman_handoff.json"))
    }
}

/// Role instruction sets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Directory with one `<role>.txt` file per role; roles without a file
    /// fall back to the compiled-in instruction set.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// Default value providers
fn default_model() -> String {
    "sonnet".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_specification_tokens() -> usize {
    4000
}

fn default_advisory_tokens() -> usize {
    8000
}

fn default_architect_tokens() -> usize {
    16000
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_max_poll_interval_secs() -> u64 {
    120
}

fn default_completion_timeout_secs() -> u64 {
    1800
}

impl ForemanConfig {
    /// Load configuration from `.foreman/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".foreman/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content).map_err(|e| {
                crate::ForemanError::Other(format!("Failed to parse config file: {}", e))
            })?)
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.foreman/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_dir = root.join(".foreman");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default()).map_err(|e| {
            crate::ForemanError::Other(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }
}

impl Default for ForemanConfig {
    fn default() -> Self {
        Self {
            models: ModelConfig::default(),
            generation: GenerationConfig::default(),
            github: GithubConfig::default(),
            completion: CompletionConfig::default(),
            handoff: HandoffConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            specification_max_tokens: default_specification_tokens(),
            researcher_max_tokens: default_advisory_tokens(),
            security_max_tokens: default_advisory_tokens(),
            architect_max_tokens: default_architect_tokens(),
            documenter_max_tokens: default_advisory_tokens(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api(),
            default_branch: default_branch(),
            token_env: default_github_token_env(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_interval_secs: default_max_poll_interval_secs(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}
