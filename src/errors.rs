use thiserror::Error;

use crate::workflow::{RequestId, Step};

/// Failure reported by a leaf collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{what} not found for key {key}")]
    NotFound { what: &'static str, key: u64 },
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("request {request_id} failed at step {step}: {source}")]
    StepFailed {
        request_id: RequestId,
        step: Step,
        #[source]
        source: LookupError,
    },
    #[error(
        "request {request_id} is already complete; a finished workflow cannot be advanced again"
    )]
    AlreadyComplete { request_id: RequestId },
    #[error("unexpected {got} value delivered while at step {step}")]
    UnexpectedValue { step: Step, got: &'static str },
    #[error("invalid workflow state: {0}")]
    InvalidState(String),
    #[error("request {request_id} was aborted before it finished")]
    Aborted { request_id: RequestId },
}

impl WorkflowError {
    /// Step at which the workflow stopped, when known
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            WorkflowError::StepFailed { step, .. } => Some(*step),
            WorkflowError::UnexpectedValue { step, .. } => Some(*step),
            WorkflowError::AlreadyComplete { .. } => Some(Step::Done),
            WorkflowError::InvalidState(_) | WorkflowError::Aborted { .. } => None,
        }
    }
}
