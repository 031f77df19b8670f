//! Simulator configuration.

/// What a component does when it receives a control input it cannot act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log the condition and fall back (hold the previous output, or use the
    /// fixed default code).
    #[default]
    Permissive,
    /// Abort the current step with a [`SimError`](crate::SimError).
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    pub(crate) error_policy: ErrorPolicy,
    pub(crate) settle_iterations: Option<u32>,
}

impl SimConfig {
    pub fn set_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Override the number of settle iterations run per step. `None` keeps the
    /// layout's own constant.
    pub fn set_settle_iterations(mut self, iterations: Option<u32>) -> Self {
        self.settle_iterations = iterations.map(|n| n.max(1));
        self
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn settle_iterations(&self) -> Option<u32> {
        self.settle_iterations
    }
}
