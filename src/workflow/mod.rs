// Find-user workflow - a suspend function desugared into a state machine
//
// `continuation` holds the hand-written state machine, `native` the async/await
// form it stands in for. Collaborators live in `repositories`.

pub mod batch;
pub mod continuation;
pub mod native;
pub mod observer;
pub mod repositories;
pub mod state;

pub use batch::BatchOutcome;
pub use continuation::{Continuation, FindUserWorkflow};
pub use native::find_user_native;
pub use observer::{NoopObserver, RecordingObserver, TransitionRecord, WorkflowObserver};
pub use repositories::{
    ImageRepository, InMemoryImageRepository, InMemoryProfileRepository, ProfileRepository,
    SimulatedLookup,
};
pub use state::{
    Image, Profile, RequestId, Step, StepValue, UserDto, UserId, UserRequest, WorkflowState,
};
