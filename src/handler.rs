//! Cancellation of long-running kernel operations.
//!
//! A handler is consulted before every recursive step of `apply`, `not`, `restrict`,
//! `exists` and `for_all`. Once it declines, the operation unwinds and returns
//! [`BddError::Canceled`][crate::error::BddError::Canceled] without caching any
//! partial result.

pub trait ComputationHandler {
    /// Called once when a top-level operation starts.
    fn started(&mut self) {}

    /// Returns `false` to cancel the running operation.
    fn should_resume(&mut self) -> bool;
}

/// Handler that never cancels.
#[derive(Debug, Default, Copy, Clone)]
pub struct NopHandler;

impl ComputationHandler for NopHandler {
    fn should_resume(&mut self) -> bool {
        true
    }
}

/// Cancels an operation after a fixed number of recursive steps.
#[derive(Debug, Clone)]
pub struct StepLimitHandler {
    limit: usize,
    steps: usize,
    aborted: bool,
}

impl StepLimitHandler {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            steps: 0,
            aborted: false,
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Whether the last operation was canceled by this handler.
    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

impl ComputationHandler for StepLimitHandler {
    fn started(&mut self) {
        self.steps = 0;
        self.aborted = false;
    }

    fn should_resume(&mut self) -> bool {
        self.steps += 1;
        if self.steps > self.limit {
            self.aborted = true;
        }
        !self.aborted
    }
}
