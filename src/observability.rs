use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::errors::WorkflowError;
use crate::workflow::{RequestId, Step, WorkflowObserver};

/// Workflow counters
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub started: AtomicU64,
    pub resumed: AtomicU64,
    pub transitions: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            started: self.started.load(Ordering::Relaxed),
            resumed: self.resumed.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            started = stats.started,
            resumed = stats.resumed,
            transitions = stats.transitions,
            completed = stats.completed,
            failed = stats.failed,
            "workflow metrics"
        );
    }
}

/// Once every workflow has finished, `started + resumed == completed + failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowStats {
    pub started: u64,
    pub resumed: u64,
    pub transitions: u64,
    pub completed: u64,
    pub failed: u64,
}

impl WorkflowStats {
    /// Workflows entered but not yet completed or failed
    pub fn in_flight(&self) -> u64 {
        (self.started + self.resumed).saturating_sub(self.completed + self.failed)
    }
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<Arc<WorkflowMetrics>> =
    std::sync::LazyLock::new(|| Arc::new(WorkflowMetrics::new()));

pub fn workflow_metrics() -> Arc<WorkflowMetrics> {
    Arc::clone(&WORKFLOW_METRICS)
}

/// Observer that logs every step and feeds [`WorkflowMetrics`]
#[derive(Debug, Clone)]
pub struct TracingObserver {
    metrics: Arc<WorkflowMetrics>,
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(workflow_metrics())
    }
}

impl TracingObserver {
    pub fn new(metrics: Arc<WorkflowMetrics>) -> Self {
        Self { metrics }
    }
}

impl WorkflowObserver for TracingObserver {
    fn on_start(&self, request_id: &RequestId) {
        self.metrics.started.fetch_add(1, Ordering::Relaxed);
        info!(request_id = %request_id, "workflow started");
    }

    fn on_resume(&self, request_id: &RequestId, step: Step) {
        self.metrics.resumed.fetch_add(1, Ordering::Relaxed);
        info!(request_id = %request_id, %step, "workflow resumed");
    }

    fn on_transition(&self, request_id: &RequestId, from: Step, to: Step) {
        self.metrics.transitions.fetch_add(1, Ordering::Relaxed);
        if to == Step::Done {
            self.metrics.completed.fetch_add(1, Ordering::Relaxed);
        }
        info!(request_id = %request_id, %from, %to, "transition");
    }

    fn on_failure(&self, request_id: &RequestId, step: Step, error: &WorkflowError) {
        self.metrics.failed.fetch_add(1, Ordering::Relaxed);
        warn!(request_id = %request_id, %step, error = %error, "workflow failed");
    }
}

/// Time a suspended step
#[derive(Debug)]
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        debug!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "step resumed"
        );
        duration
    }
}
