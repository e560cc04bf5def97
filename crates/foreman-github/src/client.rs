//! GitHub REST client for branch and pull-request operations
//!
//! The hosting collaborator is reduced to three operations: resolve the head
//! of the default integration branch, create a new ref at that commit, and
//! look up the pull request associated with a branch. Everything else about
//! GitHub is out of scope.

use async_trait::async_trait;
use foreman_core::{ForemanConfig, ForemanError, PullRequestRef, Result};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("foreman/", env!("CARGO_PKG_VERSION"));

/// Trait for the hosting collaborator (allows mocking in tests)
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// Resolve the head commit SHA of a branch
    async fn resolve_branch_head(&self, repo: &str, branch: &str) -> Result<String>;

    /// Create a new branch pointing at the given commit
    async fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()>;

    /// Find the pull request associated with a branch, if one exists
    async fn find_pull_request(&self, repo: &str, branch: &str)
        -> Result<Option<PullRequestRef>>;
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestItem {
    number: u64,
    html_url: String,
}

/// GitHub REST v3 client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    /// Create a client with an explicit token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: "https://api.github.com".to_string(),
            token: token.into(),
        }
    }

    /// Create a client from configuration, reading the token from the
    /// configured environment variable
    pub fn from_config(config: &ForemanConfig) -> Result<Self> {
        let token = std::env::var(&config.github.token_env).map_err(|_| {
            ForemanError::Auth(format!(
                "No GitHub token found. Set {}.",
                config.github.token_env
            ))
        })?;

        Ok(Self::new(token).with_api_base(&config.github.api_base))
    }

    /// Override the API base URL (enterprise installs, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
    }
}

#[async_trait]
impl HostingClient for GitHubClient {
    async fn resolve_branch_head(&self, repo: &str, branch: &str) -> Result<String> {
        let url = format!("{}/repos/{}/git/refs/heads/{}", self.api_base, repo, branch);
        tracing::debug!("Resolving head of {}@{}", repo, branch);

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| ForemanError::BranchProvision(format!("Failed to resolve head: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForemanError::BranchProvision(format!(
                "Could not resolve {}@{}: {} {}",
                repo, branch, status, body
            )));
        }

        let git_ref: GitRef = response
            .json()
            .await
            .map_err(|e| ForemanError::BranchProvision(format!("Malformed ref response: {}", e)))?;

        Ok(git_ref.object.sha)
    }

    async fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()> {
        let url = format!("{}/repos/{}/git/refs", self.api_base, repo);
        tracing::debug!("Creating branch {} in {} at {}", name, repo, sha);

        let payload = serde_json::json!({
            "ref": format!("refs/heads/{}", name),
            "sha": sha,
        });

        let response = self
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ForemanError::BranchProvision(format!("Failed to create ref: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForemanError::BranchProvision(format!(
                "Ref creation for {} rejected: {} {}",
                name, status, body
            )));
        }

        Ok(())
    }

    async fn find_pull_request(
        &self,
        repo: &str,
        branch: &str,
    ) -> Result<Option<PullRequestRef>> {
        let owner = repo.split('/').next().unwrap_or(repo);
        let url = format!(
            "{}/repos/{}/pulls?head={}:{}&state=all",
            self.api_base, repo, owner, branch
        );

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| ForemanError::Api(format!("Failed to list pull requests: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForemanError::Api(format!(
                "Pull request lookup failed: {} {}",
                status, body
            )));
        }

        let pulls: Vec<PullRequestItem> = response
            .json()
            .await
            .map_err(|e| ForemanError::Api(format!("Malformed pulls response: {}", e)))?;

        Ok(pulls.into_iter().next().map(|pr| PullRequestRef {
            number: pr.number,
            url: pr.html_url,
        }))
    }
}

/// Mock hosting client for testing
///
/// Branch creation can be set to reject (name collision), and the pull
/// request can be configured to appear only after a number of polls.
#[derive(Debug, Default)]
pub struct MockHostingClient {
    head_sha: String,
    reject_branch: bool,
    pull_request: Option<PullRequestRef>,
    polls_until_pr: usize,
    poll_count: AtomicUsize,
    created_branches: Mutex<Vec<(String, String)>>,
}

impl MockHostingClient {
    pub fn new() -> Self {
        Self {
            head_sha: "abc123".to_string(),
            ..Self::default()
        }
    }

    pub fn with_head_sha(mut self, sha: impl Into<String>) -> Self {
        self.head_sha = sha.into();
        self
    }

    /// Make branch creation fail as if the name already existed
    pub fn with_branch_rejection(mut self) -> Self {
        self.reject_branch = true;
        self
    }

    /// Return this pull request after `polls` unsuccessful lookups
    pub fn with_pull_request_after(mut self, pr: PullRequestRef, polls: usize) -> Self {
        self.pull_request = Some(pr);
        self.polls_until_pr = polls;
        self
    }

    /// Branches created so far, as (repo, name) pairs
    pub fn created_branches(&self) -> Vec<(String, String)> {
        self.created_branches.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostingClient for MockHostingClient {
    async fn resolve_branch_head(&self, _repo: &str, _branch: &str) -> Result<String> {
        Ok(self.head_sha.clone())
    }

    async fn create_branch(&self, repo: &str, name: &str, _sha: &str) -> Result<()> {
        if self.reject_branch {
            return Err(ForemanError::BranchProvision(format!(
                "Reference already exists: refs/heads/{}",
                name
            )));
        }
        self.created_branches
            .lock()
            .unwrap()
            .push((repo.to_string(), name.to_string()));
        Ok(())
    }

    async fn find_pull_request(
        &self,
        _repo: &str,
        _branch: &str,
    ) -> Result<Option<PullRequestRef>> {
        let polls = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
        if polls > self.polls_until_pr {
            Ok(self.pull_request.clone())
        } else {
            Ok(None)
        }
    }
}
