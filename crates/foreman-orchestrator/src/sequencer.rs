//! Dependency-ordered role execution
//!
//! The role dependency graph is tiny (researcher and security feed the
//! architect, documenter is independent), but it is evaluated as a graph
//! rather than a hard-coded order so a parallel scheduler can replace this
//! sequential one without changing the contract. Aggregation stays
//! deterministic either way because the context is keyed by role.

use crate::executor::execute_role;
use crate::instructions::Instructions;
use foreman_agent::GenerationClient;
use foreman_core::{
    AggregatedContext, GenerationConfig, Result, Role, RoleSet, StructuredRequest,
};

/// Stable topological execution order for a role set
///
/// Roles absent from the set are skipped entirely. Within the topological
/// constraint, ties break on the fixed vocabulary order, so the result is
/// the same for every run.
pub fn execution_order(roles: &RoleSet) -> Vec<Role> {
    let mut scheduled: Vec<Role> = Vec::with_capacity(roles.len());

    while scheduled.len() < roles.len() {
        let next = Role::ALL.iter().copied().find(|role| {
            roles.contains(role)
                && !scheduled.contains(role)
                && role
                    .dependencies()
                    .iter()
                    .all(|dep| !roles.contains(dep) || scheduled.contains(dep))
        });

        match next {
            Some(role) => scheduled.push(role),
            // Unreachable with the fixed vocabulary: the graph is acyclic.
            None => break,
        }
    }

    scheduled
}

/// Runs role executors in dependency order and aggregates their outputs
pub struct Sequencer<'a, G: GenerationClient> {
    client: &'a G,
    instructions: &'a Instructions,
    generation: &'a GenerationConfig,
}

impl<'a, G: GenerationClient> Sequencer<'a, G> {
    pub fn new(
        client: &'a G,
        instructions: &'a Instructions,
        generation: &'a GenerationConfig,
    ) -> Self {
        Self {
            client,
            instructions,
            generation,
        }
    }

    /// Produce an aggregated context with exactly one output per role
    ///
    /// The first executor failure aborts the run; the partially built
    /// context is dropped with it and never reaches the publisher.
    pub async fn run(
        &self,
        request: &StructuredRequest,
        roles: &RoleSet,
    ) -> Result<AggregatedContext> {
        let order = execution_order(roles);
        tracing::info!(
            "Sequencing {} roles: {}",
            order.len(),
            order
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        let mut context = AggregatedContext::new();

        for role in order {
            let output = execute_role(
                self.client,
                self.instructions,
                self.generation,
                role,
                request,
                &context,
            )
            .await?;
            context.insert(output);
        }

        Ok(context)
    }
}
