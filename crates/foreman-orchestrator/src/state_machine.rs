//! Pure state machine for the workflow run lifecycle
//!
//! No I/O and no dependencies on the rest of the engine: the coordinator
//! performs the side effects and feeds the outcomes in as events. All
//! transitions are strictly forward, any error event lands in `Failed`
//! with the stage it happened in, and invalid transitions go to `Failed`
//! rather than panicking.

use foreman_core::Stage;

/// Lifecycle state of one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Deriving the structured request from raw input
    Extracting,
    /// Deciding the role set
    Routing,
    /// Running role executors and aggregating outputs
    Sequencing,
    /// Creating the working branch
    BranchProvisioning,
    /// Writing the handoff payload
    Publishing,
    /// Polling for the terminal pull request
    AwaitingCompletion,
    /// Pull request reference returned
    Done,
    /// Terminal failure, tagged with the stage that broke
    Failed { stage: Stage },
}

/// Outcomes the coordinator feeds back into the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    RequestExtracted,
    RolesRouted,
    ContextAggregated,
    BranchProvisioned,
    HandoffPublished,
    PullRequestReceived,
    /// Any component error, attributed to the current stage
    Error,
}

impl RunState {
    /// The workflow stage this state corresponds to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunState::Extracting => Some(Stage::Extracting),
            RunState::Routing => Some(Stage::Routing),
            RunState::Sequencing => Some(Stage::Sequencing),
            RunState::BranchProvisioning => Some(Stage::BranchProvisioning),
            RunState::Publishing => Some(Stage::Publishing),
            RunState::AwaitingCompletion => Some(Stage::AwaitingCompletion),
            RunState::Done => None,
            RunState::Failed { stage } => Some(*stage),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed { .. })
    }
}

/// Pure state transition function
///
/// Deterministic, no side effects, never panics. Error events from any
/// non-terminal state go to `Failed` tagged with that state's stage;
/// events that make no sense in the current state also fail rather than
/// being silently ignored.
pub fn transition(state: RunState, event: RunEvent) -> RunState {
    let fail_here = |stage: Option<Stage>| RunState::Failed {
        stage: stage.unwrap_or(Stage::Extracting),
    };

    match (state, event) {
        (RunState::Extracting, RunEvent::RequestExtracted) => RunState::Routing,
        (RunState::Routing, RunEvent::RolesRouted) => RunState::Sequencing,
        (RunState::Sequencing, RunEvent::ContextAggregated) => RunState::BranchProvisioning,
        (RunState::BranchProvisioning, RunEvent::BranchProvisioned) => RunState::Publishing,
        (RunState::Publishing, RunEvent::HandoffPublished) => RunState::AwaitingCompletion,
        (RunState::AwaitingCompletion, RunEvent::PullRequestReceived) => RunState::Done,

        // Failed is sticky: the original stage attribution is preserved.
        (RunState::Failed { stage }, _) => RunState::Failed { stage },

        // Any error, and any out-of-order event, fails at the current stage.
        (state, _) => fail_here(state.stage()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_strictly_forward() {
        let mut state = RunState::Extracting;
        let events = [
            RunEvent::RequestExtracted,
            RunEvent::RolesRouted,
            RunEvent::ContextAggregated,
            RunEvent::BranchProvisioned,
            RunEvent::HandoffPublished,
            RunEvent::PullRequestReceived,
        ];
        let expected = [
            RunState::Routing,
            RunState::Sequencing,
            RunState::BranchProvisioning,
            RunState::Publishing,
            RunState::AwaitingCompletion,
            RunState::Done,
        ];

        for (event, want) in events.into_iter().zip(expected) {
            state = transition(state, event);
            assert_eq!(state, want);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_error_fails_at_current_stage() {
        let state = transition(RunState::Extracting, RunEvent::Error);
        assert_eq!(
            state,
            RunState::Failed {
                stage: Stage::Extracting
            }
        );

        let state = transition(RunState::BranchProvisioning, RunEvent::Error);
        assert_eq!(
            state,
            RunState::Failed {
                stage: Stage::BranchProvisioning
            }
        );
    }

    #[test]
    fn test_out_of_order_event_fails() {
        let state = transition(RunState::Extracting, RunEvent::PullRequestReceived);
        assert_eq!(
            state,
            RunState::Failed {
                stage: Stage::Extracting
            }
        );
    }

    #[test]
    fn test_failed_is_sticky() {
        let failed = RunState::Failed {
            stage: Stage::Sequencing,
        };
        assert_eq!(transition(failed, RunEvent::RequestExtracted), failed);
        assert_eq!(transition(failed, RunEvent::Error), failed);
    }

    #[test]
    fn test_done_accepts_no_further_events() {
        let state = transition(RunState::Done, RunEvent::RequestExtracted);
        assert!(matches!(state, RunState::Failed { .. }));
    }

    #[test]
    fn test_never_panics_on_any_pair() {
        let states = [
            RunState::Extracting,
            RunState::Routing,
            RunState::Sequencing,
            RunState::BranchProvisioning,
            RunState::Publishing,
            RunState::AwaitingCompletion,
            RunState::Done,
            RunState::Failed {
                stage: Stage::Publishing,
            },
        ];
        let events = [
            RunEvent::RequestExtracted,
            RunEvent::RolesRouted,
            RunEvent::ContextAggregated,
            RunEvent::BranchProvisioned,
            RunEvent::HandoffPublished,
            RunEvent::PullRequestReceived,
            RunEvent::Error,
        ];

        for state in states {
            for event in events {
                let _ = transition(state, event);
            }
        }
    }
}
