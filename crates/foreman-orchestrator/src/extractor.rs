//! Specification extraction
//!
//! Turns free-text input into a structured request by asking the generation
//! capability for a JSON-shaped user story and parsing whatever comes
//! back. A single malformed response is a hard failure of the run; no
//! retries at this layer.

use crate::instructions::Instructions;
use foreman_agent::{parse_structured_request, GenerationClient, GenerationRequest};
use foreman_core::{GenerationConfig, Result, StructuredRequest};

/// Extract a structured request from raw user input
pub async fn extract_request<G: GenerationClient>(
    client: &G,
    instructions: &Instructions,
    generation: &GenerationConfig,
    input: &str,
) -> Result<StructuredRequest> {
    let request = GenerationRequest::new(
        instructions.specification(),
        format!("Create a structured user story for: {}", input),
        generation.specification_max_tokens,
    );

    let result = client.generate(&request).await?;
    let structured = parse_structured_request(&result.text)?;

    tracing::info!(
        "Extracted request '{}' (complexity: {})",
        structured.title,
        structured.estimated_complexity
    );

    Ok(structured)
}
