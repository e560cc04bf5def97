//! # foreman-github
//!
//! GitHub hosting collaborator client for Foreman.
//!
//! Exposes the three operations the workflow needs (resolve a branch head,
//! create a branch, find the pull request for a branch) behind the
//! `HostingClient` trait, plus deterministic branch-name derivation.

mod client;
mod slug;

pub use client::{GitHubClient, HostingClient, MockHostingClient};
pub use slug::{branch_name, slugify, BRANCH_PREFIX};
