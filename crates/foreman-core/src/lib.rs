//! # foreman-core
//!
//! Core types for the Foreman workflow routing engine.
//!
//! Foreman turns a free-text feature request into a pull request by routing
//! the request through a fixed set of advisory roles and handing the
//! aggregated advice to a downstream execution framework. This crate holds
//! the vocabulary the other crates share:
//!
//! - The structured request and the role/complexity enumerations
//! - The aggregated per-role context
//! - The workflow run record and its stages
//! - The unified error taxonomy and configuration

mod config;
mod error;
mod types;

pub use config::{
    CompletionConfig, ForemanConfig, GenerationConfig, GithubConfig, HandoffConfig, ModelConfig,
    PromptConfig,
};
pub use error::{ForemanError, Result};
pub use types::*;
