//! Run Context: settings for one reconciliation run
use std::time::Duration;

/// Default bound on a single collaborator call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    /// Bound applied to every registry, capability and inventory call
    pub call_timeout: Option<Duration>,
    /// Reconcile implementations concurrently instead of one after another
    pub concurrent: bool,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            concurrent: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.concurrent = false;
        self
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
