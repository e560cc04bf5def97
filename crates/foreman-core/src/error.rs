//! Unified error types for Foreman
//!
//! Every error is fatal to the current workflow run. The coordinator wraps
//! component errors once with the failing stage before re-raising them, so
//! callers always see which stage broke and why.

use crate::types::{Role, Stage};
use thiserror::Error;

/// Unified error type for all Foreman operations
#[derive(Error, Debug)]
pub enum ForemanError {
    // Generation capability errors
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("API limit reached: {0}")]
    ApiLimit(String),

    // Specification extraction errors
    #[error("No JSON object found in generator output: {0}")]
    SpecificationParse(String),

    #[error("Malformed structured request: {0}")]
    SpecificationFormat(String),

    // Role execution errors
    #[error("Role '{role}' failed: {cause}")]
    RoleExecution { role: Role, cause: String },

    // Hosting collaborator errors
    #[error("Branch provisioning failed: {0}")]
    BranchProvision(String),

    // Handoff errors
    #[error("Handoff publish failed: {0}")]
    Publish(String),

    // Completion watcher errors
    #[error("No pull request appeared in time: {0}")]
    PullRequestTimeout(String),

    #[error("Run cancelled")]
    Cancelled,

    // Stage wrapper added by the coordinator
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ForemanError>,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl ForemanError {
    /// Wrap this error with the stage it occurred in.
    ///
    /// Already-wrapped errors are left untouched so the innermost stage wins.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            ForemanError::Stage { .. } => self,
            other => ForemanError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was wrapped with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ForemanError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias using ForemanError
pub type Result<T> = std::result::Result<T, ForemanError>;
