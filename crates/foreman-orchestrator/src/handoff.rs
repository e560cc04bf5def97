//! Handoff payload publishing
//!
//! Serializes the structured request plus the aggregated context into one
//! JSON payload and writes it to a well-known transient location for the
//! downstream execution framework. Absent roles are explicit `null`s so
//! the consumer never has to distinguish "missing key" from "not routed".

use foreman_core::{AggregatedContext, ForemanError, Result, Role, StructuredRequest};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Payload consumed by the downstream execution framework
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffPayload {
    pub user_story: StructuredRequest,
    pub research: Option<String>,
    pub architecture: Option<String>,
    pub documentation: Option<String>,
    pub security: Option<String>,
}

impl HandoffPayload {
    pub fn new(request: &StructuredRequest, context: &AggregatedContext) -> Self {
        let content = |role: Role| context.get(role).map(|output| output.content.clone());

        Self {
            user_story: request.clone(),
            research: content(Role::Researcher),
            architecture: content(Role::Architect),
            documentation: content(Role::Documenter),
            security: content(Role::Security),
        }
    }
}

/// Writes handoff payloads for the downstream framework
#[derive(Debug, Clone)]
pub struct HandoffPublisher {
    path: PathBuf,
}

impl HandoffPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize and write the payload; returns the written path
    pub async fn publish(
        &self,
        request: &StructuredRequest,
        context: &AggregatedContext,
    ) -> Result<PathBuf> {
        let payload = HandoffPayload::new(request, context);
        let content = serde_json::to_string_pretty(&payload)
            .map_err(|e| ForemanError::Publish(format!("Failed to serialize payload: {}", e)))?;

        tokio::fs::write(&self.path, content).await.map_err(|e| {
            ForemanError::Publish(format!(
                "Failed to write payload to {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::info!("Published handoff payload to {}", self.path.display());
        Ok(self.path.clone())
    }
}
