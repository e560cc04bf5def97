//! Completion watcher
//!
//! Polls the hosting collaborator until the downstream framework and its CI
//! pipeline have produced a pull request for the branch. The poll interval
//! backs off exponentially up to a cap; the total wait is bounded and a
//! miss is `PullRequestTimeout`.

use foreman_core::{CompletionConfig, ForemanError, PullRequestRef, Result};
use foreman_github::HostingClient;
use std::time::Instant;

/// Waits for the terminal pull-request artifact
#[derive(Debug, Clone)]
pub struct CompletionWatcher {
    config: CompletionConfig,
}

impl CompletionWatcher {
    pub fn new(config: CompletionConfig) -> Self {
        Self { config }
    }

    /// Poll until a pull request for `branch` appears or the budget runs out
    pub async fn wait_for_pull_request<H: HostingClient>(
        &self,
        hosting: &H,
        repo: &str,
        branch: &str,
    ) -> Result<PullRequestRef> {
        let deadline = Instant::now() + self.config.timeout();
        let mut interval = self.config.poll_interval();

        tracing::info!(
            "Waiting for pull request on {}@{} (budget {:?})",
            repo,
            branch,
            self.config.timeout()
        );

        loop {
            if let Some(pr) = hosting.find_pull_request(repo, branch).await? {
                tracing::info!("Pull request found: {}", pr);
                return Ok(pr);
            }

            if Instant::now() >= deadline {
                return Err(ForemanError::PullRequestTimeout(format!(
                    "no pull request for {}@{} within {:?}",
                    repo,
                    branch,
                    self.config.timeout()
                )));
            }

            tracing::debug!("No pull request yet, next poll in {:?}", interval);
            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(self.config.max_poll_interval());
        }
    }
}
