use crate::pipeline::{InferenceOutcome, StageTimings};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct RegisterState {
    last_error: String,
    timings: StageTimings,
    outcome: Option<InferenceOutcome>,
}

/// Sticky error and timing state read back by the host after each call.
///
/// Writes never fail. Reads return snapshots and default to an empty
/// string, zero timings and no outcome. Only the latest attempt is kept.
#[derive(Default)]
pub struct StateRegister {
    state: Mutex<RegisterState>,
}

impl StateRegister {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegisterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a failure that did not come from a run, e.g. a failed load.
    pub fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.lock().last_error = message;
    }

    pub fn record_success(&self, outcome: &InferenceOutcome) {
        let mut state = self.lock();
        state.timings = outcome.timings;
        state.outcome = Some(outcome.clone());
    }

    /// A failed run clears the previous outcome so accessors never report
    /// stale results.
    pub fn record_failure(&self, message: impl Into<String>, timings: StageTimings) {
        let message = message.into();
        log::error!("{}", message);
        let mut state = self.lock();
        state.last_error = message;
        state.timings = timings;
        state.outcome = None;
    }

    pub fn last_error(&self) -> String {
        self.lock().last_error.clone()
    }

    pub fn timings(&self) -> StageTimings {
        self.lock().timings
    }

    pub fn last_outcome(&self) -> Option<InferenceOutcome> {
        self.lock().outcome.clone()
    }

    /// Read one field of the last outcome without cloning the whole tensor.
    pub fn with_outcome<R>(&self, f: impl FnOnce(Option<&InferenceOutcome>) -> R) -> R {
        f(self.lock().outcome.as_ref())
    }
}
