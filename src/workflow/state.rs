// Core types for the find-user workflow state machine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::WorkflowError;

/// Identifier of a user whose profile and image are fetched
pub type UserId = u64;

/// Correlation id of one in-flight workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh uuid-based id
    pub fn generate() -> Self {
        Self(crate::telemetry::generate_correlation_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request to assemble a [`UserDto`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub id: RequestId,
    pub user_id: UserId,
}

impl UserRequest {
    pub fn new(id: RequestId, user_id: UserId) -> Self {
        Self { id, user_id }
    }

    /// Request for `user_id` with a generated request id
    pub fn for_user(user_id: UserId) -> Self {
        Self::new(RequestId::generate(), user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
}

impl Profile {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
}

impl Image {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

/// Final output of a completed workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub profile: Profile,
    pub image: Image,
}

impl fmt::Display for UserDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UserDto(profile=Profile(id={}), image=Image(id={}))",
            self.profile.id, self.image.id
        )
    }
}

/// Program counter of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    FetchProfile,
    FetchImage,
    Done,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::FetchProfile => "fetch_profile",
            Step::FetchImage => "fetch_image",
            Step::Done => "done",
        };
        f.write_str(name)
    }
}

/// Value handed to a continuation by a collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepValue {
    Profile(Profile),
    Image(Image),
}

impl StepValue {
    pub fn kind(&self) -> &'static str {
        match self {
            StepValue::Profile(_) => "profile",
            StepValue::Image(_) => "image",
        }
    }
}

impl From<Profile> for StepValue {
    fn from(profile: Profile) -> Self {
        StepValue::Profile(profile)
    }
}

impl From<Image> for StepValue {
    fn from(image: Image) -> Self {
        StepValue::Image(image)
    }
}

/// Heap frame of the desugared `find_user` call.
///
/// The frame belongs to the workflow of `user_id`. `profile` is present from
/// `FetchImage` on, `image` only at `Done`. The `resumed` marker is set by the
/// completion handler and never survives serialization, so a `Done` state can
/// only yield its result once, on the invocation that directly follows the
/// final resumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    user_id: UserId,
    step: Step,
    profile: Option<Profile>,
    image: Option<Image>,
    #[serde(skip)]
    resumed: bool,
}

impl WorkflowState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            step: Step::FetchProfile,
            profile: None,
            image: None,
            resumed: false,
        }
    }

    /// Rebuild a state from its parts, rejecting combinations the workflow
    /// could never have produced.
    pub fn restore(
        user_id: UserId,
        step: Step,
        profile: Option<Profile>,
        image: Option<Image>,
    ) -> Result<Self, WorkflowError> {
        let state = Self {
            user_id,
            step,
            profile,
            image,
            resumed: false,
        };
        state.validate()?;
        Ok(state)
    }

    /// Parse a JSON snapshot produced by [`WorkflowState::to_json`]
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        let state: Self = serde_json::from_str(json)
            .map_err(|e| WorkflowError::InvalidState(format!("malformed snapshot: {e}")))?;
        state.validate()?;
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String, WorkflowError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WorkflowError::InvalidState(format!("unserializable state: {e}")))
    }

    /// User whose workflow this frame belongs to
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    pub(crate) fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Reject a frame that belongs to another user's workflow
    pub fn check_owner(&self, user_id: UserId) -> Result<(), WorkflowError> {
        if self.user_id != user_id {
            return Err(WorkflowError::InvalidState(format!(
                "state of user {} cannot be advanced for user {user_id}",
                self.user_id
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        match (self.step, &self.profile, &self.image) {
            (Step::FetchProfile, None, None) => Ok(()),
            (Step::FetchImage, Some(_), None) => Ok(()),
            (Step::Done, Some(_), Some(_)) => Ok(()),
            (step, profile, image) => Err(WorkflowError::InvalidState(format!(
                "step {step} with profile={} image={}",
                profile.is_some(),
                image.is_some()
            ))),
        }
    }

    /// Store the value produced by the pending step and move to the next one.
    ///
    /// Returns the `(from, to)` pair of the transition.
    pub(crate) fn complete_step(
        &mut self,
        value: StepValue,
    ) -> Result<(Step, Step), WorkflowError> {
        let from = self.step;
        match (from, value) {
            (Step::FetchProfile, StepValue::Profile(profile)) => {
                self.profile = Some(profile);
                self.step = Step::FetchImage;
            }
            (Step::FetchImage, StepValue::Image(image)) => {
                self.image = Some(image);
                self.step = Step::Done;
            }
            (step, got) => {
                return Err(WorkflowError::UnexpectedValue {
                    step,
                    got: got.kind(),
                });
            }
        }
        self.resumed = true;
        Ok((from, self.step))
    }

    /// Assemble the final result, consuming the state
    pub(crate) fn into_dto(self) -> Result<UserDto, WorkflowError> {
        match (self.step, self.profile, self.image) {
            (Step::Done, Some(profile), Some(image)) => Ok(UserDto { profile, image }),
            (step, ..) => Err(WorkflowError::InvalidState(format!(
                "cannot assemble a result at step {step}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_at_fetch_profile() {
        let state = WorkflowState::new(1);
        assert_eq!(state.step(), Step::FetchProfile);
        assert!(state.profile().is_none());
        assert!(state.image().is_none());
        assert!(!state.is_resumed());
    }

    #[test]
    fn test_complete_step_walks_forward() {
        let mut state = WorkflowState::new(1);

        let transition = state.complete_step(Profile::new(1).into()).unwrap();
        assert_eq!(transition, (Step::FetchProfile, Step::FetchImage));
        assert_eq!(state.profile(), Some(&Profile::new(1)));
        assert!(state.image().is_none());

        let transition = state.complete_step(Image::new(1).into()).unwrap();
        assert_eq!(transition, (Step::FetchImage, Step::Done));
        assert_eq!(state.image(), Some(&Image::new(1)));
        assert!(state.is_resumed());

        let dto = state.into_dto().unwrap();
        assert_eq!(dto.profile, Profile::new(1));
        assert_eq!(dto.image, Image::new(1));
    }

    #[test]
    fn test_complete_step_rejects_wrong_value() {
        let mut state = WorkflowState::new(1);
        let err = state.complete_step(Image::new(3).into()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::UnexpectedValue { step: Step::FetchProfile, got: "image" }
        ));
        assert_eq!(state.step(), Step::FetchProfile);
    }

    #[test]
    fn test_nothing_completes_after_done() {
        let mut state =
            WorkflowState::restore(1, Step::Done, Some(Profile::new(1)), Some(Image::new(1)))
                .unwrap();
        assert!(state.complete_step(Image::new(2).into()).is_err());
    }

    #[test]
    fn test_restore_rejects_inconsistent_parts() {
        assert!(WorkflowState::restore(1, Step::FetchImage, None, None).is_err());
        assert!(WorkflowState::restore(1, Step::Done, Some(Profile::new(1)), None).is_err());
        assert!(WorkflowState::restore(1, Step::FetchProfile, None, Some(Image::new(1))).is_err());
        assert!(WorkflowState::restore(1, Step::FetchImage, Some(Profile::new(4)), None).is_ok());
    }

    #[test]
    fn test_snapshot_drops_resumed_marker() {
        let mut state = WorkflowState::new(1);
        state.complete_step(Profile::new(9).into()).unwrap();
        assert!(state.is_resumed());

        let json = state.to_json().unwrap();
        assert!(json.contains("fetch_image"));

        let restored = WorkflowState::from_json(&json).unwrap();
        assert_eq!(restored.user_id(), 1);
        assert_eq!(restored.step(), Step::FetchImage);
        assert_eq!(restored.profile(), Some(&Profile::new(9)));
        assert!(!restored.is_resumed());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            WorkflowState::from_json("{ not json"),
            Err(WorkflowError::InvalidState(_))
        ));
        let missing_profile = r#"{"user_id":1,"step":"done","profile":null,"image":{"id":1}}"#;
        assert!(WorkflowState::from_json(missing_profile).is_err());
        let missing_owner = r#"{"step":"fetch_image","profile":{"id":1},"image":null}"#;
        assert!(WorkflowState::from_json(missing_owner).is_err());
    }

    #[test]
    fn test_check_owner_rejects_other_user() {
        let state =
            WorkflowState::restore(5, Step::FetchImage, Some(Profile::new(5)), None).unwrap();
        assert!(state.check_owner(5).is_ok());
        assert!(matches!(state.check_owner(1), Err(WorkflowError::InvalidState(_))));
    }

    #[test]
    fn test_user_dto_display() {
        let dto = UserDto {
            profile: Profile::new(1),
            image: Image::new(1),
        };
        assert_eq!(
            dto.to_string(),
            "UserDto(profile=Profile(id=1), image=Image(id=1))"
        );
    }
}
