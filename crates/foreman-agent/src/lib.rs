//! # foreman-agent
//!
//! Anthropic API client and response parsing for Foreman.
//!
//! The generation capability is treated as unreliable: it may return
//! non-conformant text, rate-limit, or fail outright. This crate wraps it
//! behind a small trait so the workflow engine can be tested without any
//! live API, and isolates the parsing of generator output.

mod auth;
mod client;
mod extract;
mod types;

pub use auth::{get_auth_token, OAUTH_TOKEN_ENV};
pub use client::{AnthropicClient, GenerationClient, MockGenerationClient};
pub use extract::{extract_json_object, parse_structured_request};
pub use types::*;
