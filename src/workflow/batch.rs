// Independent workflows running side by side

use tokio::task::JoinSet;
use tracing::{info, Instrument};

use crate::errors::WorkflowError;
use crate::telemetry::create_workflow_span;
use crate::workflow::continuation::FindUserWorkflow;
use crate::workflow::{UserDto, UserId, UserRequest};

#[derive(Debug)]
pub struct BatchOutcome {
    pub request: UserRequest,
    pub result: Result<UserDto, WorkflowError>,
}

impl FindUserWorkflow {
    /// Run one fresh workflow per user concurrently. Outcomes come back in
    /// input order.
    pub async fn run_batch(&self, user_ids: &[UserId]) -> Vec<BatchOutcome> {
        let requests: Vec<UserRequest> =
            user_ids.iter().copied().map(UserRequest::for_user).collect();
        let mut tasks = JoinSet::new();

        for (index, request) in requests.iter().cloned().enumerate() {
            let workflow = self.clone();
            let span = create_workflow_span(request.id.as_str(), request.user_id);
            tasks.spawn(
                async move { (index, workflow.advance(request, None).await) }.instrument(span),
            );
        }

        let mut results: Vec<Option<Result<UserDto, WorkflowError>>> =
            (0..requests.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "workflow task did not finish"),
            }
        }

        let outcomes: Vec<BatchOutcome> = requests
            .into_iter()
            .zip(results)
            .map(|(request, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(WorkflowError::Aborted {
                        request_id: request.id.clone(),
                    })
                });
                BatchOutcome { request, result }
            })
            .collect();

        info!(
            total = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.result.is_err()).count(),
            "batch finished"
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::observer::RecordingObserver;
    use crate::workflow::repositories::{
        InMemoryImageRepository, InMemoryProfileRepository, SimulatedLookup,
    };
    use crate::workflow::Step;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_batch_keeps_input_order_and_isolation() {
        let observer = Arc::new(RecordingObserver::new());
        let workflow = FindUserWorkflow::new(
            Arc::new(InMemoryProfileRepository::default()),
            Arc::new(InMemoryImageRepository::default()),
        )
        .with_observer(observer.clone());

        let outcomes = workflow.run_batch(&[3, 1, 2]).await;

        let ids: Vec<u64> = outcomes
            .iter()
            .map(|o| o.result.as_ref().unwrap().profile.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
        for outcome in &outcomes {
            let dto = outcome.result.as_ref().unwrap();
            assert_eq!(dto.profile.id, outcome.request.user_id);
            assert_eq!(dto.image.id, outcome.request.user_id);
            assert_eq!(
                observer.steps_for(&outcome.request.id),
                vec![Step::FetchProfile, Step::FetchImage, Step::Done]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_failure_does_not_affect_others() {
        let workflow = FindUserWorkflow::new(
            Arc::new(InMemoryProfileRepository::new(
                SimulatedLookup::new(Duration::from_millis(50)).with_known_keys([1, 3]),
            )),
            Arc::new(InMemoryImageRepository::default()),
        );

        let outcomes = workflow.run_batch(&[1, 2, 3]).await;

        assert!(outcomes[0].result.is_ok());
        assert_eq!(
            outcomes[1].result.as_ref().unwrap_err().failed_step(),
            Some(Step::FetchProfile)
        );
        assert!(outcomes[2].result.is_ok());
    }
}
