//! Authentication for the Anthropic API
//!
//! Supports two authentication methods:
//! 1. Claude Code OAuth token (CLAUDE_CODE_OAUTH_TOKEN)
//! 2. A standard API key, read from the configured environment variable
//!    (ANTHROPIC_API_KEY by default)

use foreman_core::{ForemanError, Result};
use std::env;

/// Environment variable holding the OAuth token, checked first
pub const OAUTH_TOKEN_ENV: &str = "CLAUDE_CODE_OAUTH_TOKEN";

/// Get an authentication token for the Anthropic API
///
/// Priority:
/// 1. CLAUDE_CODE_OAUTH_TOKEN
/// 2. The configured API key environment variable
pub fn get_auth_token(api_key_env: &str) -> Result<String> {
    if let Ok(oauth_token) = env::var(OAUTH_TOKEN_ENV) {
        tracing::info!("Using Claude Code OAuth token");
        return Ok(oauth_token);
    }

    if let Ok(api_key) = env::var(api_key_env) {
        tracing::info!("Using {}", api_key_env);
        return Ok(api_key);
    }

    Err(ForemanError::Auth(format!(
        "No authentication found. Set either {} or {}.",
        OAUTH_TOKEN_ENV, api_key_env
    )))
}
