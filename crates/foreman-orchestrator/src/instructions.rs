//! Role instruction sets
//!
//! Each role gets a fixed system-level directive, loaded once at
//! construction and immutable afterwards. A prompts directory can override
//! any of the compiled-in defaults with one `<role>.txt` file per role
//! (plus `specification.txt` for the extraction step).

use foreman_core::{PromptConfig, Result, Role};
use std::collections::BTreeMap;
use std::path::Path;

const SPECIFICATION_PROMPT: &str = "\
You are an expert product manager. Convert the user's request into a \
structured user story.

Output format (JSON):
{
    \"title\": \"Short feature title\",
    \"summary\": \"As [role], I want [action], so that [benefit]\",
    \"acceptance_criteria\": [\"Criterion 1\", \"Criterion 2\"],
    \"technical_notes\": \"Relevant technical notes\",
    \"estimated_complexity\": \"low|medium|high\"
}

Respond with the JSON object only.";

const RESEARCHER_PROMPT: &str = "\
You are a research specialist for software teams. Given a user story, \
survey the landscape: relevant libraries and frameworks, established \
patterns, and known pitfalls. Cite sources when you used search. Be \
concrete and keep findings actionable.";

const SECURITY_PROMPT: &str = "\
You are a security expert. Given a user story, identify data-protection \
requirements, access-control implications, audit-logging needs, and \
applicable compliance regimes. Flag anything that must block a naive \
implementation.";

const ARCHITECT_PROMPT: &str = "\
You are a senior software architect. Given a user story and any research \
or security findings, produce design guidance: component boundaries, data \
flow, interfaces, and the tradeoffs behind each recommendation. Prefer the \
simplest design that satisfies the acceptance criteria.";

const DOCUMENTER_PROMPT: &str = "\
You are a technical writer. Given a user story, draft the user-facing and \
developer-facing documentation the finished feature will need: what it \
does, how to use it, and how it behaves at the edges.";

/// Immutable instruction sets for all roles
#[derive(Debug, Clone)]
pub struct Instructions {
    specification: String,
    roles: BTreeMap<Role, String>,
}

impl Instructions {
    /// Compiled-in defaults
    pub fn builtin() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(Role::Researcher, RESEARCHER_PROMPT.to_string());
        roles.insert(Role::Security, SECURITY_PROMPT.to_string());
        roles.insert(Role::Architect, ARCHITECT_PROMPT.to_string());
        roles.insert(Role::Documenter, DOCUMENTER_PROMPT.to_string());

        Self {
            specification: SPECIFICATION_PROMPT.to_string(),
            roles,
        }
    }

    /// Defaults with per-file overrides from a prompts directory
    pub fn load(dir: &Path) -> Result<Self> {
        let mut instructions = Self::builtin();

        let spec_path = dir.join("specification.txt");
        if spec_path.exists() {
            instructions.specification = std::fs::read_to_string(&spec_path)?;
        }

        for role in Role::ALL {
            let path = dir.join(format!("{}.txt", role));
            if path.exists() {
                instructions
                    .roles
                    .insert(role, std::fs::read_to_string(&path)?);
            }
        }

        Ok(instructions)
    }

    /// Resolve instruction sets from configuration
    pub fn from_config(config: &PromptConfig) -> Result<Self> {
        match &config.dir {
            Some(dir) => Self::load(dir),
            None => Ok(Self::builtin()),
        }
    }

    /// Instruction set for specification extraction
    pub fn specification(&self) -> &str {
        &self.specification
    }

    /// Instruction set for an advisory role
    pub fn for_role(&self, role: Role) -> &str {
        // builtin() seeds every role, so the lookup cannot miss
        self.roles
            .get(&role)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Default for Instructions {
    fn default() -> Self {
        Self::builtin()
    }
}
