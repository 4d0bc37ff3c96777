// continuation-fetch - a suspend function desugared into an explicit state machine
// This exposes the workflow and its ambient stack for the CLI and for tests

pub mod config;
pub mod errors;
pub mod observability;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::ContinuationFetchConfig;
pub use errors::{LookupError, WorkflowError};
pub use observability::{workflow_metrics, OperationTimer, TracingObserver, WorkflowMetrics};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    find_user_native, Continuation, FindUserWorkflow, Image, Profile, RequestId, Step, UserDto,
    UserRequest, WorkflowState,
};
