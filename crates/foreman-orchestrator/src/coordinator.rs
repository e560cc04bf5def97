//! Run coordinator
//!
//! Top-level control flow for one workflow run: extract, route, sequence,
//! provision, publish, await completion. The coordinator owns end-to-end
//! error surfacing: every component error is wrapped once with the failing
//! stage and the run transitions to `Failed`. There is no local recovery,
//! partial-result salvage, or retry between stages.

use crate::extractor::extract_request;
use crate::handoff::HandoffPublisher;
use crate::instructions::Instructions;
use crate::provisioner::provision_branch;
use crate::router::route;
use crate::sequencer::Sequencer;
use crate::state_machine::{transition, RunEvent, RunState};
use crate::watcher::CompletionWatcher;
use foreman_agent::GenerationClient;
use foreman_core::{
    ForemanConfig, ForemanError, PullRequestRef, Result, Stage, WorkflowRun,
};
use foreman_github::HostingClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Run-scoped cancellation handle
///
/// Cancelling aborts the run at the next stage boundary with a
/// distinguished `Cancelled` cause.
#[derive(Debug, Clone)]
pub struct CancellationHandle(Arc<AtomicBool>);

impl CancellationHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Coordinates one workflow run at a time
///
/// Instruction sets are loaded once at construction and are read-only
/// afterwards; no state is shared across runs beyond them.
pub struct Coordinator<G: GenerationClient, H: HostingClient> {
    config: ForemanConfig,
    instructions: Instructions,
    generation: G,
    hosting: H,
    state: RunState,
    cancelled: Arc<AtomicBool>,
}

impl<G: GenerationClient, H: HostingClient> Coordinator<G, H> {
    pub fn new(config: ForemanConfig, generation: G, hosting: H) -> Result<Self> {
        let instructions = Instructions::from_config(&config.prompts)?;

        Ok(Self {
            config,
            instructions,
            generation,
            hosting,
            state: RunState::Extracting,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Handle for cancelling the in-flight run
    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle(Arc::clone(&self.cancelled))
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(ForemanError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Record a stage outcome: advance on success, fail-and-wrap on error
    fn stage_result<T>(&mut self, result: Result<T>, event: RunEvent) -> Result<T> {
        match result {
            Ok(value) => {
                self.state = transition(self.state, event);
                Ok(value)
            }
            Err(err) => {
                let stage = self.state.stage().unwrap_or(Stage::Extracting);
                self.state = transition(self.state, RunEvent::Error);
                Err(err.at_stage(stage))
            }
        }
    }

    /// Process one feature request end to end
    ///
    /// Returns the pull-request reference on success; on failure the run
    /// ends in `Failed` and the error names the stage that broke.
    pub async fn handle_request(&mut self, input: &str, repo: &str) -> Result<PullRequestRef> {
        let mut run = WorkflowRun::new(repo);
        self.state = RunState::Extracting;

        info!(run_id = %run.id, "Processing request for {}", repo);

        // 1. Extract the structured request
        info!("[1/6] Extracting structured request");
        let result = match self.checkpoint() {
            Ok(()) => {
                extract_request(
                    &self.generation,
                    &self.instructions,
                    &self.config.generation,
                    input,
                )
                .await
            }
            Err(e) => Err(e),
        };
        let request = self.stage_result(result, RunEvent::RequestExtracted)?;
        run.request = Some(request.clone());

        // 2. Route to advisory roles
        info!("[2/6] Routing to advisory roles");
        let result = self.checkpoint().map(|()| route(&request));
        let roles = self.stage_result(result, RunEvent::RolesRouted)?;
        info!(
            "Roles required: {}",
            roles
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        run.roles = roles.clone();

        // 3. Run role executors in dependency order
        info!("[3/6] Sequencing role executors");
        let result = match self.checkpoint() {
            Ok(()) => {
                let sequencer = Sequencer::new(
                    &self.generation,
                    &self.instructions,
                    &self.config.generation,
                );
                sequencer.run(&request, &roles).await
            }
            Err(e) => Err(e),
        };
        let context = self.stage_result(result, RunEvent::ContextAggregated)?;
        run.context = context.clone();

        // 4. Provision the working branch
        info!("[4/6] Provisioning branch");
        let result = match self.checkpoint() {
            Ok(()) => {
                provision_branch(
                    &self.hosting,
                    repo,
                    &self.config.github.default_branch,
                    &request.title,
                )
                .await
            }
            Err(e) => Err(e),
        };
        let branch = self.stage_result(result, RunEvent::BranchProvisioned)?;
        run.branch = Some(branch.clone());

        // 5. Publish the handoff payload
        info!("[5/6] Publishing handoff payload");
        let result = match self.checkpoint() {
            Ok(()) => {
                let publisher = HandoffPublisher::new(self.config.handoff.resolved_path());
                publisher.publish(&request, &context).await.map(|_| ())
            }
            Err(e) => Err(e),
        };
        self.stage_result(result, RunEvent::HandoffPublished)?;

        // 6. Await the terminal pull request
        info!("[6/6] Awaiting pull request");
        let result = match self.checkpoint() {
            Ok(()) => {
                let watcher = CompletionWatcher::new(self.config.completion.clone());
                watcher
                    .wait_for_pull_request(&self.hosting, repo, &branch)
                    .await
            }
            Err(e) => Err(e),
        };
        let pull_request = self.stage_result(result, RunEvent::PullRequestReceived)?;
        run.pull_request = Some(pull_request.clone());

        info!(run_id = %run.id, "Request completed: {}", pull_request);
        Ok(pull_request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_agent::MockGenerationClient;
    use foreman_core::Role;
    use foreman_github::MockHostingClient;

    const OAUTH_STORY: &str = r#"{
        "title": "Add OAuth2 login",
        "summary": "As a user, I want to log in with OAuth2",
        "acceptance_criteria": ["Login redirects to provider"],
        "technical_notes": "Authorization code flow",
        "estimated_complexity": "high"
    }"#;

    const TYPO_STORY: &str = r#"{
        "title": "Fix typo in README",
        "summary": "As a reader, I want correct docs",
        "acceptance_criteria": [],
        "technical_notes": "",
        "estimated_complexity": "low"
    }"#;

    fn test_config(handoff_path: std::path::PathBuf) -> ForemanConfig {
        let mut config = ForemanConfig::default();
        config.handoff.path = Some(handoff_path);
        config.completion.poll_interval_secs = 0;
        config.completion.max_poll_interval_secs = 0;
        config.completion.timeout_secs = 5;
        config
    }

    fn pr() -> PullRequestRef {
        PullRequestRef {
            number: 101,
            url: "https://github.com/acme/widgets/pull/101".to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_run_returns_pull_request() {
        let dir = tempfile::tempdir().unwrap();
        let handoff_path = dir.path().join("handoff.json");

        let generation = MockGenerationClient::new();
        generation.push_response(OAUTH_STORY);
        generation.push_response("research findings");
        generation.push_response("security findings");
        generation.push_response("design guidance");
        generation.push_response("documentation");

        let hosting = MockHostingClient::new().with_pull_request_after(pr(), 0);

        let mut coordinator = Coordinator::new(
            test_config(handoff_path.clone()),
            generation.clone(),
            hosting,
        )
        .unwrap();

        let result = coordinator
            .handle_request("Add OAuth2 login to the API", "acme/widgets")
            .await
            .unwrap();

        assert_eq!(result.number, 101);
        assert_eq!(coordinator.state(), RunState::Done);

        // One extraction call plus all four routed roles.
        assert_eq!(generation.call_count(), 5);

        // The payload reached the downstream framework's location.
        let payload: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&handoff_path).unwrap()).unwrap();
        assert_eq!(payload["user_story"]["title"], "Add OAuth2 login");
        assert_eq!(payload["research"], "research findings");
    }

    #[tokio::test]
    async fn test_minimal_request_routes_two_roles() {
        let dir = tempfile::tempdir().unwrap();

        let generation = MockGenerationClient::new();
        generation.push_response(TYPO_STORY);
        generation.push_response("design guidance");
        generation.push_response("documentation");

        let hosting = MockHostingClient::new().with_pull_request_after(pr(), 0);

        let mut coordinator = Coordinator::new(
            test_config(dir.path().join("handoff.json")),
            generation.clone(),
            hosting,
        )
        .unwrap();

        coordinator
            .handle_request("Fix typo in README", "acme/widgets")
            .await
            .unwrap();

        // Extraction plus architect and documenter only.
        assert_eq!(generation.call_count(), 3);
        let calls = generation.calls();
        // No researcher call: nothing requested the search capability.
        assert!(calls.iter().all(|c| !c.enable_search));
    }

    #[tokio::test]
    async fn test_prose_only_generator_output_fails_at_extracting() {
        let dir = tempfile::tempdir().unwrap();

        let generation = MockGenerationClient::new();
        generation.push_response("Sorry, I can't help with that.");

        let hosting = MockHostingClient::new();
        let mut coordinator = Coordinator::new(
            test_config(dir.path().join("handoff.json")),
            generation,
            hosting,
        )
        .unwrap();

        let err = coordinator
            .handle_request("anything", "acme/widgets")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Extracting));
        assert!(matches!(
            err,
            ForemanError::Stage { source, .. }
                if matches!(*source, ForemanError::SpecificationParse(_))
        ));
        assert_eq!(
            coordinator.state(),
            RunState::Failed {
                stage: Stage::Extracting
            }
        );
    }

    #[tokio::test]
    async fn test_branch_rejection_discards_aggregated_context() {
        let dir = tempfile::tempdir().unwrap();
        let handoff_path = dir.path().join("handoff.json");

        let generation = MockGenerationClient::new();
        generation.push_response(OAUTH_STORY);
        // Role outputs succeed; the branch is what fails.
        for _ in 0..4 {
            generation.push_response("advice");
        }

        let hosting = MockHostingClient::new().with_branch_rejection();
        let mut coordinator = Coordinator::new(
            test_config(handoff_path.clone()),
            generation,
            hosting,
        )
        .unwrap();

        let err = coordinator
            .handle_request("Add OAuth2 login", "acme/widgets")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::BranchProvisioning));
        assert_eq!(
            coordinator.state(),
            RunState::Failed {
                stage: Stage::BranchProvisioning
            }
        );
        // The successfully aggregated context was never published.
        assert!(!handoff_path.exists());
    }

    #[tokio::test]
    async fn test_role_failure_fails_at_sequencing() {
        let dir = tempfile::tempdir().unwrap();

        let generation = MockGenerationClient::new();
        generation.push_response(OAUTH_STORY);
        generation.push_error(ForemanError::Api("connection reset".to_string()));

        let hosting = MockHostingClient::new();
        let mut coordinator = Coordinator::new(
            test_config(dir.path().join("handoff.json")),
            generation,
            hosting,
        )
        .unwrap();

        let err = coordinator
            .handle_request("Add OAuth2 login", "acme/widgets")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Sequencing));
        assert!(matches!(
            err,
            ForemanError::Stage { source, .. }
                if matches!(*source, ForemanError::RoleExecution { role: Role::Researcher, .. })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_at_stage_boundary() {
        let dir = tempfile::tempdir().unwrap();

        let generation = MockGenerationClient::new();
        let hosting = MockHostingClient::new();
        let mut coordinator = Coordinator::new(
            test_config(dir.path().join("handoff.json")),
            generation.clone(),
            hosting,
        )
        .unwrap();

        coordinator.cancellation_handle().cancel();

        let err = coordinator
            .handle_request("anything", "acme/widgets")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ForemanError::Stage { source, .. } if matches!(*source, ForemanError::Cancelled)
        ));
        // Nothing was invoked after the cancellation checkpoint.
        assert_eq!(generation.call_count(), 0);
        assert!(matches!(coordinator.state(), RunState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_pull_request_timeout_fails_at_awaiting_completion() {
        let dir = tempfile::tempdir().unwrap();

        let generation = MockGenerationClient::new();
        generation.push_response(TYPO_STORY);
        generation.push_response("design");
        generation.push_response("docs");

        // No pull request ever appears.
        let hosting = MockHostingClient::new();

        let mut config = test_config(dir.path().join("handoff.json"));
        config.completion.timeout_secs = 0;

        let mut coordinator = Coordinator::new(config, generation, hosting).unwrap();

        let err = coordinator
            .handle_request("Fix typo in README", "acme/widgets")
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::AwaitingCompletion));
        assert!(matches!(
            err,
            ForemanError::Stage { source, .. }
                if matches!(*source, ForemanError::PullRequestTimeout(_))
        ));
    }
}
