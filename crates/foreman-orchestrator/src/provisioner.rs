//! Branch provisioning
//!
//! Derives a ref-safe branch name from the request title, resolves the head
//! of the default integration branch, and creates the new ref at that
//! commit. Name collisions are fatal; no alternate-name generation is
//! attempted (known gap, kept deliberate rather than invented around).

use foreman_core::Result;
use foreman_github::{branch_name, HostingClient};

/// Provision a working branch for a request
///
/// Returns the created branch name.
pub async fn provision_branch<H: HostingClient>(
    hosting: &H,
    repo: &str,
    default_branch: &str,
    title: &str,
) -> Result<String> {
    let name = branch_name(title);

    let sha = hosting.resolve_branch_head(repo, default_branch).await?;
    hosting.create_branch(repo, &name, &sha).await?;

    tracing::info!("Provisioned branch {} in {} at {}", name, repo, sha);
    Ok(name)
}
