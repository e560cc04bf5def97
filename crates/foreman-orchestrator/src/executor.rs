//! Role executors
//!
//! One executor invocation per role: the role's fixed instruction set plus a
//! user payload built from the structured request and whatever dependency
//! outputs already exist in the aggregated context. The architect is the
//! only role with input dependencies; the researcher is the only role
//! offered the search capability.

use crate::instructions::Instructions;
use foreman_agent::{GenerationClient, GenerationRequest};
use foreman_core::{
    AggregatedContext, ForemanError, GenerationConfig, Result, Role, RoleOutput, StructuredRequest,
};

/// Build the user payload for one role invocation
///
/// Pure function: the payload depends only on the request, the role, and
/// the dependency outputs present in the context when the role runs.
pub fn build_role_payload(
    role: Role,
    request: &StructuredRequest,
    context: &AggregatedContext,
) -> String {
    let story = serde_json::to_string_pretty(request).unwrap_or_default();
    let mut payload = String::new();

    match role {
        Role::Researcher => {
            payload.push_str("Research for this feature:\n\n");
            payload.push_str("User Story:\n");
            payload.push_str(&story);
            payload.push_str("\n\nFocus on:\n");
            payload.push_str("- Best libraries/frameworks for this use case\n");
            payload.push_str("- Best practices and patterns\n");
            payload.push_str("- Security considerations\n");
            payload.push_str("- Compliance requirements\n");
        }
        Role::Security => {
            payload.push_str("Analyze security requirements for:\n\n");
            payload.push_str(&story);
            payload.push_str("\n\nFocus on:\n");
            payload.push_str("- Data protection (encryption, access control)\n");
            payload.push_str("- Compliance (HIPAA, GDPR, 21 CFR Part 11)\n");
            payload.push_str("- Audit logging requirements\n");
            payload.push_str("- Security testing requirements\n");
        }
        Role::Architect => {
            payload.push_str("User Story:\n");
            payload.push_str(&story);

            if let Some(research) = context.get(Role::Researcher) {
                payload.push_str("\n\nResearch Findings:\n");
                payload.push_str(&research.content);
            }

            if let Some(security) = context.get(Role::Security) {
                payload.push_str("\n\nSecurity Requirements:\n");
                payload.push_str(&security.content);
            }
        }
        Role::Documenter => {
            payload.push_str("Create documentation for:\n");
            payload.push_str(&story);
        }
    }

    payload
}

/// Run one role's executor
///
/// Any transport or generation failure maps to `RoleExecution` with the
/// role identifier attached; the sequencer decides what that means for the
/// run (today: always fatal).
pub async fn execute_role<G: GenerationClient>(
    client: &G,
    instructions: &Instructions,
    generation: &GenerationConfig,
    role: Role,
    request: &StructuredRequest,
    context: &AggregatedContext,
) -> Result<RoleOutput> {
    let mut gen_request = GenerationRequest::new(
        instructions.for_role(role),
        build_role_payload(role, request, context),
        generation.budget_for(role),
    );

    if role == Role::Researcher {
        gen_request = gen_request.with_search();
    }

    tracing::info!("Running {} role", role);

    let result = client
        .generate(&gen_request)
        .await
        .map_err(|e| ForemanError::RoleExecution {
            role,
            cause: e.to_string(),
        })?;

    tracing::info!("{} role completed ({} chars)", role, result.text.len());

    let mut output = RoleOutput::new(role, result.text);
    if let Some(usage) = result.usage {
        output = output.with_usage(usage);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_agent::MockGenerationClient;
    use foreman_core::Complexity;

    fn request() -> StructuredRequest {
        StructuredRequest {
            title: "Add OAuth2 login".to_string(),
            summary: "As a user, I want SSO".to_string(),
            acceptance_criteria: vec!["Login works".to_string()],
            technical_notes: String::new(),
            estimated_complexity: Complexity::Medium,
        }
    }

    #[test]
    fn test_architect_payload_includes_dependency_outputs() {
        let mut context = AggregatedContext::new();
        context.insert(RoleOutput::new(Role::Researcher, "use library X"));
        context.insert(RoleOutput::new(Role::Security, "encrypt tokens"));

        let payload = build_role_payload(Role::Architect, &request(), &context);
        assert!(payload.contains("Research Findings"));
        assert!(payload.contains("use library X"));
        assert!(payload.contains("Security Requirements"));
        assert!(payload.contains("encrypt tokens"));
    }

    #[test]
    fn test_architect_payload_omits_absent_dependencies() {
        let payload = build_role_payload(Role::Architect, &request(), &AggregatedContext::new());
        assert!(payload.contains("User Story"));
        assert!(!payload.contains("Research Findings"));
        assert!(!payload.contains("Security Requirements"));
    }

    #[test]
    fn test_independent_roles_see_only_the_request() {
        let mut context = AggregatedContext::new();
        context.insert(RoleOutput::new(Role::Researcher, "findings"));

        for role in [Role::Security, Role::Documenter] {
            let payload = build_role_payload(role, &request(), &context);
            assert!(!payload.contains("findings"));
        }
    }

    #[tokio::test]
    async fn test_execute_role_uses_role_budget_and_search() {
        let client = MockGenerationClient::new();
        client.push_response("research output");

        let generation = GenerationConfig::default();
        let output = execute_role(
            &client,
            &Instructions::builtin(),
            &generation,
            Role::Researcher,
            &request(),
            &AggregatedContext::new(),
        )
        .await
        .unwrap();

        assert_eq!(output.role, Role::Researcher);
        assert_eq!(output.content, "research output");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].enable_search);
        assert_eq!(calls[0].max_tokens, generation.researcher_max_tokens);
    }

    #[tokio::test]
    async fn test_execute_role_failure_carries_role_id() {
        let client = MockGenerationClient::new();
        client.push_error(ForemanError::Api("connection reset".to_string()));

        let err = execute_role(
            &client,
            &Instructions::builtin(),
            &GenerationConfig::default(),
            Role::Security,
            &request(),
            &AggregatedContext::new(),
        )
        .await
        .unwrap_err();

        match err {
            ForemanError::RoleExecution { role, cause } => {
                assert_eq!(role, Role::Security);
                assert!(cause.contains("connection reset"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_is_researcher_only() {
        let client = MockGenerationClient::new();

        for role in [Role::Security, Role::Architect, Role::Documenter] {
            execute_role(
                &client,
                &Instructions::builtin(),
                &GenerationConfig::default(),
                role,
                &request(),
                &AggregatedContext::new(),
            )
            .await
            .unwrap();
        }

        assert!(client.calls().iter().all(|call| !call.enable_search));
    }
}
