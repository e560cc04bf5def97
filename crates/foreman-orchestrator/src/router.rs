//! Role routing for structured requests
//!
//! Routing is a deterministic keyword-membership test over the lower-cased
//! JSON serialization of the request. Every decision is traceable to a
//! literal keyword match, which keeps routing explainable. Architect and
//! documenter are unconditional; researcher and security are keyword-gated.

use foreman_core::{Role, RoleSet, StructuredRequest};

/// New-feature/integration vocabulary that pulls in the researcher
const FEATURE_KEYWORDS: &[&str] = &[
    "add",
    "implement",
    "create",
    "new",
    "integrat",
    "connect",
    "auth",
];

/// Sensitive-data/compliance vocabulary that pulls in the security role
const SENSITIVE_KEYWORDS: &[&str] = &[
    "auth",
    "security",
    "password",
    "token",
    "credential",
    "encrypt",
    "pharma",
    "patient",
    "hipaa",
    "gdpr",
];

/// Decide which advisory roles a request needs
///
/// Never fails and never returns an empty set: {architect, documenter} is
/// the floor for any input.
pub fn route(request: &StructuredRequest) -> RoleSet {
    // Serialization cannot fail for this plain-data struct
    let text = serde_json::to_string(request)
        .unwrap_or_default()
        .to_lowercase();

    let mut roles = RoleSet::new();
    roles.insert(Role::Architect);
    roles.insert(Role::Documenter);

    if FEATURE_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        roles.insert(Role::Researcher);
    }

    if SENSITIVE_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        roles.insert(Role::Security);
    }

    tracing::debug!(
        "Routed '{}' to {} roles: {:?}",
        request.title,
        roles.len(),
        roles
    );

    roles
}
