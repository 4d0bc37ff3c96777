// Transition observer - lets callers watch the state machine move

use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::errors::WorkflowError;
use crate::workflow::{RequestId, Step};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Receives every step change and every terminal failure of a workflow
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait WorkflowObserver: Send + Sync {
    /// A fresh workflow was allocated
    fn on_start(&self, request_id: &RequestId);

    /// A workflow was picked up again at `step` from a state supplied by the
    /// caller rather than by the completion handler
    fn on_resume(&self, request_id: &RequestId, step: Step);

    /// The completion handler moved the state from `from` to `to`
    fn on_transition(&self, request_id: &RequestId, from: Step, to: Step);

    /// The workflow stopped at `step` without producing a result
    fn on_failure(&self, request_id: &RequestId, step: Step, error: &WorkflowError);
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {
    fn on_start(&self, _request_id: &RequestId) {}

    fn on_resume(&self, _request_id: &RequestId, _step: Step) {}

    fn on_transition(&self, _request_id: &RequestId, _from: Step, _to: Step) {}

    fn on_failure(&self, _request_id: &RequestId, _step: Step, _error: &WorkflowError) {}
}

/// One recorded step change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub request_id: RequestId,
    pub from: Step,
    pub to: Step,
    pub at: DateTime<Utc>,
}

/// Observer that keeps an in-memory journal of transitions
#[derive(Debug, Default)]
pub struct RecordingObserver {
    started: Mutex<Vec<RequestId>>,
    resumed: Mutex<Vec<(RequestId, Step)>>,
    transitions: Mutex<Vec<TransitionRecord>>,
    failures: Mutex<Vec<(RequestId, Step, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<RequestId> {
        lock(&self.started).clone()
    }

    pub fn resumed(&self) -> Vec<(RequestId, Step)> {
        lock(&self.resumed).clone()
    }

    pub fn transitions(&self) -> Vec<TransitionRecord> {
        lock(&self.transitions).clone()
    }

    /// Steps visited by one request, starting with `FetchProfile`
    pub fn steps_for(&self, request_id: &RequestId) -> Vec<Step> {
        let transitions = lock(&self.transitions);
        let mut steps = Vec::new();
        for record in transitions.iter().filter(|r| &r.request_id == request_id) {
            if steps.is_empty() {
                steps.push(record.from);
            }
            steps.push(record.to);
        }
        steps
    }

    pub fn failures(&self) -> Vec<(RequestId, Step, String)> {
        lock(&self.failures).clone()
    }
}

// A poisoned journal is still a valid journal
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl WorkflowObserver for RecordingObserver {
    fn on_start(&self, request_id: &RequestId) {
        lock(&self.started).push(request_id.clone());
    }

    fn on_resume(&self, request_id: &RequestId, step: Step) {
        lock(&self.resumed).push((request_id.clone(), step));
    }

    fn on_transition(&self, request_id: &RequestId, from: Step, to: Step) {
        lock(&self.transitions).push(TransitionRecord {
            request_id: request_id.clone(),
            from,
            to,
            at: Utc::now(),
        });
    }

    fn on_failure(&self, request_id: &RequestId, step: Step, error: &WorkflowError) {
        lock(&self.failures).push((request_id.clone(), step, error.to_string()));
    }
}
