//! Type definitions for Foreman workflow runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::collections::btree_map::{self, BTreeMap};
use uuid::Uuid;

/// Advisory role identifiers
///
/// The `Ord` derive follows declaration order, which is also the stable
/// execution order the sequencer uses: researcher and security feed the
/// architect, documenter has no dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Researcher,
    Security,
    Architect,
    Documenter,
}

impl Role {
    /// All roles in stable execution order
    pub const ALL: [Role; 4] = [
        Role::Researcher,
        Role::Security,
        Role::Architect,
        Role::Documenter,
    ];

    /// Roles this role needs to see the output of, when present
    pub fn dependencies(&self) -> &'static [Role] {
        match self {
            Role::Architect => &[Role::Researcher, Role::Security],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Researcher => write!(f, "researcher"),
            Role::Security => write!(f, "security"),
            Role::Architect => write!(f, "architect"),
            Role::Documenter => write!(f, "documenter"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "researcher" => Ok(Role::Researcher),
            "security" => Ok(Role::Security),
            "architect" => Ok(Role::Architect),
            "documenter" => Ok(Role::Documenter),
            _ => Err(format!(
                "Invalid role: {}. Use researcher, security, architect, or documenter.",
                s
            )),
        }
    }
}

/// Set of roles a request was routed to
pub type RoleSet = BTreeSet<Role>;

/// Complexity estimate for a structured request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Low => write!(f, "low"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::High => write!(f, "high"),
        }
    }
}

/// Normalized representation of a user's feature ask
///
/// Produced once by the specification extractor and read-only afterwards.
/// Field names match the JSON shape the extraction instruction set requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRequest {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub technical_notes: String,
    pub estimated_complexity: Complexity,
}

impl StructuredRequest {
    /// Check that the required fields carry usable content.
    ///
    /// Serde guarantees presence and types; this catches empty strings the
    /// generator sometimes emits when it hedges.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if self.summary.trim().is_empty() {
            return Err("summary is empty".to_string());
        }
        Ok(())
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Free-form text produced by one role's executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleOutput {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub usage: Option<Usage>,
}

impl RoleOutput {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Per-role output collection built by the sequencer
///
/// Append-only within a run and keyed by role identifier, so aggregation is
/// deterministic regardless of completion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedContext {
    outputs: BTreeMap<Role, RoleOutput>,
}

impl AggregatedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, output: RoleOutput) {
        self.outputs.insert(output.role, output);
    }

    pub fn get(&self, role: Role) -> Option<&RoleOutput> {
        self.outputs.get(&role)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.outputs.contains_key(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.outputs.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Role, RoleOutput> {
        self.outputs.iter()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Reference to the terminal pull-request artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub url: String,
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Workflow stages, in forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Extracting,
    Routing,
    BranchProvisioning,
    Sequencing,
    Publishing,
    AwaitingCompletion,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extracting => write!(f, "extracting"),
            Stage::Routing => write!(f, "routing"),
            Stage::BranchProvisioning => write!(f, "branch-provisioning"),
            Stage::Sequencing => write!(f, "sequencing"),
            Stage::Publishing => write!(f, "publishing"),
            Stage::AwaitingCompletion => write!(f, "awaiting-completion"),
        }
    }
}

/// Transient state for one in-flight workflow run
///
/// Mutated stage-by-stage by the coordinator; never persisted beyond process
/// memory except for the single handoff payload.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub repo: String,
    pub request: Option<StructuredRequest>,
    pub roles: RoleSet,
    pub context: AggregatedContext,
    pub branch: Option<String>,
    pub pull_request: Option<PullRequestRef>,
}

impl WorkflowRun {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            repo: repo.into(),
            request: None,
            roles: RoleSet::new(),
            context: AggregatedContext::new(),
            branch: None,
            pull_request: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering_matches_pipeline() {
        let mut set = RoleSet::new();
        set.insert(Role::Documenter);
        set.insert(Role::Architect);
        set.insert(Role::Researcher);
        set.insert(Role::Security);

        let ordered: Vec<Role> = set.into_iter().collect();
        assert_eq!(ordered, Role::ALL);
    }

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("reviewer".parse::<Role>().is_err());
    }

    #[test]
    fn test_architect_dependencies() {
        assert_eq!(
            Role::Architect.dependencies(),
            &[Role::Researcher, Role::Security]
        );
        assert!(Role::Documenter.dependencies().is_empty());
    }

    #[test]
    fn test_structured_request_validate() {
        let request = StructuredRequest {
            title: "Add OAuth2 login".to_string(),
            summary: "As a user, I want to log in with OAuth2".to_string(),
            acceptance_criteria: vec!["Login works".to_string()],
            technical_notes: String::new(),
            estimated_complexity: Complexity::Medium,
        };
        assert!(request.validate().is_ok());

        let empty_title = StructuredRequest {
            title: "  ".to_string(),
            ..request
        };
        assert!(empty_title.validate().is_err());
    }

    #[test]
    fn test_structured_request_deserializes_with_defaults() {
        let json = r#"{
            "title": "Fix typo",
            "summary": "As a reader, I want correct docs",
            "estimated_complexity": "low"
        }"#;
        let request: StructuredRequest = serde_json::from_str(json).unwrap();
        assert!(request.acceptance_criteria.is_empty());
        assert_eq!(request.estimated_complexity, Complexity::Low);
    }

    #[test]
    fn test_structured_request_rejects_missing_title() {
        let json = r#"{"summary": "s", "estimated_complexity": "low"}"#;
        assert!(serde_json::from_str::<StructuredRequest>(json).is_err());
    }

    #[test]
    fn test_aggregated_context_is_keyed_by_role() {
        let mut ctx = AggregatedContext::new();
        ctx.insert(RoleOutput::new(Role::Architect, "first"));
        ctx.insert(RoleOutput::new(Role::Architect, "second"));

        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get(Role::Architect).unwrap().content, "second");
        assert!(!ctx.contains(Role::Researcher));
    }

    #[test]
    fn test_aggregated_context_serializes_role_keys() {
        let mut ctx = AggregatedContext::new();
        ctx.insert(RoleOutput::new(Role::Security, "findings"));

        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json["outputs"]["security"]["content"]
            .as_str()
            .unwrap()
            .contains("findings"));
    }
}
