//! # foreman-orchestrator
//!
//! Routing and sequencing engine for Foreman workflow runs.
//!
//! The engine turns one feature request into a pull-request reference:
//!
//! 1. Extract a structured request from free text
//! 2. Route it to the advisory roles it needs
//! 3. Run the role executors in dependency order and aggregate their output
//! 4. Provision a working branch
//! 5. Publish the handoff payload for the downstream execution framework
//! 6. Wait for the pull request to appear
//!
//! Failure anywhere is fatal to the run: fail fast, report the stage.

mod coordinator;
mod executor;
mod extractor;
mod handoff;
mod instructions;
mod provisioner;
mod router;
mod sequencer;
mod state_machine;
mod watcher;

pub use coordinator::{CancellationHandle, Coordinator};
pub use executor::{build_role_payload, execute_role};
pub use extractor::extract_request;
pub use handoff::{HandoffPayload, HandoffPublisher};
pub use instructions::Instructions;
pub use provisioner::provision_branch;
pub use router::route;
pub use sequencer::{execution_order, Sequencer};
pub use state_machine::{transition, RunEvent, RunState};
pub use watcher::CompletionWatcher;
