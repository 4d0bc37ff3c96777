// Leaf collaborators of the find-user workflow

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::config::LookupConfig;
use crate::errors::{LookupError, WorkflowError};
use crate::workflow::continuation::Continuation;
use crate::workflow::{Image, Profile, StepValue, UserDto, UserId};

/// Profile lookup (step 1)
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Produce the profile of `user_id`
    async fn lookup_profile(&self, user_id: UserId) -> Result<Profile, LookupError>;

    /// Continuation-passing form: look the profile up, then hand the outcome to
    /// `continuation` and return whatever the resumed workflow returns.
    async fn find_profile(
        &self,
        user_id: UserId,
        continuation: Continuation,
    ) -> Result<UserDto, WorkflowError> {
        let outcome = self.lookup_profile(user_id).await;
        continuation.resume_with(outcome.map(StepValue::from)).await
    }
}

/// Image lookup (step 2), keyed by the profile from step 1
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn lookup_image(&self, profile: &Profile) -> Result<Image, LookupError>;

    async fn find_image(
        &self,
        profile: &Profile,
        continuation: Continuation,
    ) -> Result<UserDto, WorkflowError> {
        let outcome = self.lookup_image(profile).await;
        continuation.resume_with(outcome.map(StepValue::from)).await
    }
}

/// Latency and failure behaviour shared by the in-memory repositories
#[derive(Debug, Clone)]
pub struct SimulatedLookup {
    latency: Duration,
    timeout: Option<Duration>,
    known_keys: Option<HashSet<u64>>,
    calls: Arc<AtomicU64>,
}

impl Default for SimulatedLookup {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl SimulatedLookup {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            timeout: None,
            known_keys: None,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        let mut lookup = Self::new(Duration::from_millis(config.latency_ms));
        if let Some(timeout_ms) = config.timeout_ms {
            lookup = lookup.with_timeout(Duration::from_millis(timeout_ms));
        }
        if !config.known_keys.is_empty() {
            lookup = lookup.with_known_keys(config.known_keys.iter().copied());
        }
        lookup
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Restrict lookups to `keys`; anything else is `NotFound`
    pub fn with_known_keys(mut self, keys: impl IntoIterator<Item = u64>) -> Self {
        self.known_keys = Some(keys.into_iter().collect());
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    async fn run(
        &self,
        what: &'static str,
        operation: &'static str,
        key: u64,
    ) -> Result<(), LookupError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        debug!(operation, key, latency_ms = self.latency.as_millis() as u64, "simulating lookup");

        match self.timeout {
            Some(limit) => timeout(limit, sleep(self.latency))
                .await
                .map_err(|_| LookupError::Timeout {
                    operation,
                    after_ms: limit.as_millis() as u64,
                })?,
            None => sleep(self.latency).await,
        }

        match &self.known_keys {
            Some(keys) if !keys.contains(&key) => Err(LookupError::NotFound { what, key }),
            _ => Ok(()),
        }
    }
}

/// Profiles whose id is the user id
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileRepository {
    lookup: SimulatedLookup,
}

impl InMemoryProfileRepository {
    pub fn new(lookup: SimulatedLookup) -> Self {
        Self { lookup }
    }

    pub fn calls(&self) -> u64 {
        self.lookup.calls()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn lookup_profile(&self, user_id: UserId) -> Result<Profile, LookupError> {
        self.lookup.run("profile", "find_profile", user_id).await?;
        Ok(Profile::new(user_id))
    }
}

/// Images whose id is the profile id
#[derive(Debug, Clone, Default)]
pub struct InMemoryImageRepository {
    lookup: SimulatedLookup,
}

impl InMemoryImageRepository {
    pub fn new(lookup: SimulatedLookup) -> Self {
        Self { lookup }
    }

    pub fn calls(&self) -> u64 {
        self.lookup.calls()
    }
}

#[async_trait]
impl ImageRepository for InMemoryImageRepository {
    async fn lookup_image(&self, profile: &Profile) -> Result<Image, LookupError> {
        self.lookup.run("image", "find_image", profile.id).await?;
        Ok(Image::new(profile.id))
    }
}
