//! Checkout progress tracking.

use serde::{Deserialize, Serialize};

/// The state of one checkout attempt.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FulfillmentState {
    #[default]
    NotStarted,

    /// Steps are being executed.
    Running,

    /// Every required step finished (terminal state).
    Completed,

    /// A required step failed (terminal state).
    Failed,
}

impl FulfillmentState {
    /// Returns true if the checkout can begin running.
    pub fn can_run(&self) -> bool {
        matches!(self, FulfillmentState::NotStarted)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FulfillmentState::Completed | FulfillmentState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentState::NotStarted => "NotStarted",
            FulfillmentState::Running => "Running",
            FulfillmentState::Completed => "Completed",
            FulfillmentState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for FulfillmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Steps run so far in one checkout attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckoutProgress {
    pub state: FulfillmentState,
    /// Steps that finished.
    pub completed_steps: Vec<&'static str>,
    /// Secondary steps that failed without failing the checkout.
    pub degraded_steps: Vec<&'static str>,
}

impl CheckoutProgress {
    pub(crate) fn start(&mut self) {
        if self.state.can_run() {
            self.state = FulfillmentState::Running;
        }
    }

    pub(crate) fn completed(&mut self, step: &'static str) {
        self.completed_steps.push(step);
    }

    pub(crate) fn degraded(&mut self, step: &'static str) {
        self.degraded_steps.push(step);
    }

    pub(crate) fn finish(&mut self) {
        self.state = FulfillmentState::Completed;
    }

    pub(crate) fn fail(&mut self) {
        self.state = FulfillmentState::Failed;
    }
}
