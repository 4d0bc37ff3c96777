// The same pipeline written with async/await; the state machine in
// `continuation` is what the compiler turns this into.

use tracing::{debug, Instrument};

use crate::errors::WorkflowError;
use crate::telemetry::create_workflow_span;
use crate::workflow::continuation::FindUserWorkflow;
use crate::workflow::repositories::{ImageRepository, ProfileRepository};
use crate::workflow::{Step, UserDto, UserRequest};

pub async fn find_user_native(
    profiles: &dyn ProfileRepository,
    images: &dyn ImageRepository,
    request: &UserRequest,
) -> Result<UserDto, WorkflowError> {
    debug!(request_id = %request.id, "fetching profile");
    let profile = profiles
        .lookup_profile(request.user_id)
        .await
        .map_err(|source| WorkflowError::StepFailed {
            request_id: request.id.clone(),
            step: Step::FetchProfile,
            source,
        })?;

    debug!(request_id = %request.id, profile_id = profile.id, "fetching image");
    let image = images
        .lookup_image(&profile)
        .await
        .map_err(|source| WorkflowError::StepFailed {
            request_id: request.id.clone(),
            step: Step::FetchImage,
            source,
        })?;

    Ok(UserDto { profile, image })
}

impl FindUserWorkflow {
    /// Run `request` without the hand-written state machine
    pub async fn run_native(&self, request: UserRequest) -> Result<UserDto, WorkflowError> {
        let span = create_workflow_span(request.id.as_str(), request.user_id);
        find_user_native(self.profiles.as_ref(), self.images.as_ref(), &request)
            .instrument(span)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LookupError;
    use crate::workflow::repositories::{
        InMemoryImageRepository, InMemoryProfileRepository, SimulatedLookup,
    };
    use crate::workflow::{Image, Profile};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_native_matches_state_machine() {
        let workflow = FindUserWorkflow::new(
            Arc::new(InMemoryProfileRepository::default()),
            Arc::new(InMemoryImageRepository::default()),
        );

        let native = workflow.run_native(UserRequest::for_user(12)).await.unwrap();
        let desugared = workflow.find_user(12).await.unwrap();

        assert_eq!(native, desugared);
        assert_eq!(native.profile, Profile::new(12));
        assert_eq!(native.image, Image::new(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_reports_failing_step() {
        let profiles = InMemoryProfileRepository::default();
        let images = InMemoryImageRepository::new(
            SimulatedLookup::default().with_known_keys(Vec::<u64>::new()),
        );

        let err = find_user_native(&profiles, &images, &UserRequest::for_user(1))
            .await
            .unwrap_err();

        match err {
            WorkflowError::StepFailed { step, source, .. } => {
                assert_eq!(step, Step::FetchImage);
                assert_eq!(source, LookupError::NotFound { what: "image", key: 1 });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
