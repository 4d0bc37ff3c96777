// Desugared find-user: an explicit state machine resumed by callbacks
//
// Each call to `advance` runs exactly one step. A step hands a `Continuation`
// owning the state to a collaborator; the collaborator resumes it, the
// continuation records the produced value and re-enters `advance`. The final
// `UserDto` travels back out through every nested call.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::config::ContinuationFetchConfig;
use crate::errors::{LookupError, WorkflowError};
use crate::observability::{OperationTimer, TracingObserver};
use crate::telemetry::create_workflow_span;
use crate::workflow::observer::{NoopObserver, WorkflowObserver};
use crate::workflow::repositories::{
    ImageRepository, InMemoryImageRepository, InMemoryProfileRepository, ProfileRepository,
    SimulatedLookup,
};
use crate::workflow::{Step, StepValue, UserDto, UserId, UserRequest, WorkflowState};

/// The find-user workflow and its collaborators
#[derive(Clone)]
pub struct FindUserWorkflow {
    pub(crate) profiles: Arc<dyn ProfileRepository>,
    pub(crate) images: Arc<dyn ImageRepository>,
    observer: Arc<dyn WorkflowObserver>,
}

impl fmt::Debug for FindUserWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FindUserWorkflow").finish_non_exhaustive()
    }
}

impl FindUserWorkflow {
    pub fn new(profiles: Arc<dyn ProfileRepository>, images: Arc<dyn ImageRepository>) -> Self {
        Self {
            profiles,
            images,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Workflow over the in-memory collaborators described by `config`,
    /// reporting to the global metrics
    pub fn from_config(config: &ContinuationFetchConfig) -> Self {
        let profiles =
            InMemoryProfileRepository::new(SimulatedLookup::from_config(&config.profile_lookup));
        let images =
            InMemoryImageRepository::new(SimulatedLookup::from_config(&config.image_lookup));
        Self::new(Arc::new(profiles), Arc::new(images))
            .with_observer(Arc::new(TracingObserver::default()))
    }

    pub fn with_observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run one step of `request`.
    ///
    /// With no `state` a fresh workflow starts at [`Step::FetchProfile`]. A
    /// pending step suspends inside its collaborator and only returns once the
    /// chain of resumptions has reached [`Step::Done`] or failed.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::InvalidState`] when `state` is inconsistent or belongs
    /// to another user, [`WorkflowError::AlreadyComplete`] when handed a
    /// finished state that was not delivered by the completion handler,
    /// [`WorkflowError::StepFailed`] when a collaborator reports a failure.
    pub async fn advance(
        &self,
        request: UserRequest,
        state: Option<WorkflowState>,
    ) -> Result<UserDto, WorkflowError> {
        let state = match state {
            Some(state) if state.is_resumed() => state,
            Some(state) => {
                debug!(request_id = %request.id, step = %state.step(), "resuming workflow");
                self.observer.on_resume(&request.id, state.step());
                if let Err(error) = state
                    .validate()
                    .and_then(|()| state.check_owner(request.user_id))
                {
                    warn!(request_id = %request.id, error = %error, "rejected supplied state");
                    self.observer.on_failure(&request.id, state.step(), &error);
                    return Err(error);
                }
                state
            }
            None => {
                debug!(request_id = %request.id, user_id = request.user_id, "starting workflow");
                self.observer.on_start(&request.id);
                WorkflowState::new(request.user_id)
            }
        };

        match state.step() {
            Step::FetchProfile => {
                debug!(request_id = %request.id, "fetching profile");
                let user_id = request.user_id;
                let continuation = self.suspend(request, state);
                self.profiles.find_profile(user_id, continuation).await
            }
            Step::FetchImage => {
                let profile = state.profile().cloned().ok_or_else(|| {
                    WorkflowError::InvalidState("fetch_image without a profile".to_string())
                })?;
                debug!(request_id = %request.id, profile_id = profile.id, "fetching image");
                let continuation = self.suspend(request, state);
                self.images.find_image(&profile, continuation).await
            }
            Step::Done if state.is_resumed() => {
                let dto = state.into_dto()?;
                info!(
                    request_id = %request.id,
                    profile_id = dto.profile.id,
                    image_id = dto.image.id,
                    "workflow completed"
                );
                Ok(dto)
            }
            Step::Done => {
                let error = WorkflowError::AlreadyComplete {
                    request_id: request.id.clone(),
                };
                warn!(request_id = %request.id, "advance called on a finished workflow");
                self.observer.on_failure(&request.id, Step::Done, &error);
                Err(error)
            }
        }
    }

    /// Start a fresh workflow for `user_id` under its own span
    pub async fn find_user(&self, user_id: UserId) -> Result<UserDto, WorkflowError> {
        self.run(UserRequest::for_user(user_id)).await
    }

    pub async fn run(&self, request: UserRequest) -> Result<UserDto, WorkflowError> {
        let span = create_workflow_span(request.id.as_str(), request.user_id);
        self.advance(request, None).instrument(span).await
    }

    /// Continue a workflow from a previously taken snapshot, on behalf of the
    /// user the snapshot belongs to
    pub async fn resume(&self, snapshot: WorkflowState) -> Result<UserDto, WorkflowError> {
        let request = UserRequest::for_user(snapshot.user_id());
        let span = create_workflow_span(request.id.as_str(), request.user_id);
        self.advance(request, Some(snapshot)).instrument(span).await
    }

    fn suspend(&self, request: UserRequest, state: WorkflowState) -> Continuation {
        Continuation {
            timer: OperationTimer::new(&state.step().to_string()),
            workflow: self.clone(),
            request,
            state,
        }
    }
}

/// Pending step of one workflow, handed to the collaborator running it.
///
/// Resuming consumes the continuation, so a step is resumed at most once.
pub struct Continuation {
    workflow: FindUserWorkflow,
    request: UserRequest,
    state: WorkflowState,
    timer: OperationTimer,
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("request", &self.request)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Continuation {
    pub fn request(&self) -> &UserRequest {
        &self.request
    }

    /// Step this continuation is waiting on
    pub fn step(&self) -> Step {
        self.state.step()
    }

    /// Completion handler: record the outcome of the pending step and drive the
    /// workflow forward.
    pub async fn resume_with(
        self,
        outcome: Result<StepValue, LookupError>,
    ) -> Result<UserDto, WorkflowError> {
        let Continuation {
            workflow,
            request,
            mut state,
            timer,
        } = self;
        let step = state.step();
        timer.finish();

        let value = match outcome {
            Ok(value) => value,
            Err(source) => {
                let error = WorkflowError::StepFailed {
                    request_id: request.id.clone(),
                    step,
                    source,
                };
                warn!(request_id = %request.id, %step, error = %error, "step failed");
                workflow.observer.on_failure(&request.id, step, &error);
                return Err(error);
            }
        };

        let (from, to) = match state.complete_step(value) {
            Ok(transition) => transition,
            Err(error) => {
                warn!(request_id = %request.id, %step, error = %error, "rejected step value");
                workflow.observer.on_failure(&request.id, step, &error);
                return Err(error);
            }
        };
        debug!(request_id = %request.id, %from, %to, "step completed");
        workflow.observer.on_transition(&request.id, from, to);

        workflow.advance(request, Some(state)).await
    }
}
