//! # Playback Attempts
//!
//! Drives one [`MediaInstance`] from `Created` to `Playing`:
//!
//! 1. move to `Loading` and ask the surface to (re)load
//! 2. wait for readiness; a timeout or load error costs one attempt
//! 3. once ready, rewind and issue the play command
//! 4. an accepted play leaves the instance `Playing` at position zero
//!
//! Failed attempts back off linearly (`backoff * attempts`) until
//! [`RetryPolicy::max_retries`] attempts have been spent, then the instance
//! is `Errored`. An autoplay-policy denial of audio is expected behaviour on
//! restricted platforms: it ends the attempt immediately and is logged at
//! debug level only. A surface the host reports as unusable (detached,
//! unavailable) is not retried either.
//!
//! Disposal cancels the instance token; every suspension point below races
//! it, and once it fires no further transitions or surface calls happen.

use std::time::Duration;

use bridge_traits::{MediaKind, PlayRejection};
use core_async::time::sleep;
use core_runtime::events::{CoreEvent, MediaEvent};
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::instance::{InstanceState, MediaInstance};
use crate::readiness::{ReadinessError, ReadinessWaiter};

/// Declarative retry policy shared by every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up.
    pub max_retries: u32,
    /// Base delay; the wait after the n-th failure is `backoff * n`.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Whether another attempt is allowed after `failed` failures.
    pub fn should_retry(&self, failed: u32) -> bool {
        failed < self.max_retries
    }

    pub fn backoff_for(&self, failed: u32) -> Duration {
        self.backoff.saturating_mul(failed)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Runs load → ready → play for one instance with bounded retries.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackAttempt {
    waiter: ReadinessWaiter,
    policy: RetryPolicy,
}

impl PlaybackAttempt {
    pub fn new(waiter: ReadinessWaiter, policy: RetryPolicy) -> Self {
        Self { waiter, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns `true` iff the instance is now `Playing`.
    pub async fn run(&self, instance: &MediaInstance) -> bool {
        self.run_detailed(instance).await.is_ok()
    }

    /// Like [`run`](Self::run) but reports why playback did not start.
    pub async fn run_detailed(&self, instance: &MediaInstance) -> Result<()> {
        let cancel = instance.cancellation();

        loop {
            let failure = match self.try_once(instance).await {
                Ok(()) => return Ok(()),
                Err(PlaybackError::Disposed) => {
                    debug!(instance_id = %instance.id(), "Attempt aborted by disposal");
                    return Err(PlaybackError::Disposed);
                }
                Err(err) if err.is_expected_degradation() => {
                    instance.transition(InstanceState::Errored)?;
                    return Err(err);
                }
                Err(err) if !err.is_retryable() => {
                    warn!(
                        request_id = %instance.request_id(),
                        instance_id = %instance.id(),
                        kind = %instance.kind(),
                        error = %err,
                        "Media surface unusable"
                    );
                    instance.transition(InstanceState::Errored)?;
                    return Err(err);
                }
                Err(err) => err,
            };

            let failed = instance.record_failed_attempt();
            if !self.policy.should_retry(failed) {
                warn!(
                    request_id = %instance.request_id(),
                    instance_id = %instance.id(),
                    kind = %instance.kind(),
                    attempts = failed,
                    error = %failure,
                    "Giving up on media instance"
                );
                instance.transition(InstanceState::Errored)?;
                return Err(failure);
            }

            let delay = self.policy.backoff_for(failed);
            debug!(
                request_id = %instance.request_id(),
                instance_id = %instance.id(),
                kind = %instance.kind(),
                attempt = failed,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Retrying media instance"
            );

            core_async::select! {
                biased;
                _ = cancel.cancelled() => return Err(PlaybackError::Disposed),
                _ = sleep(delay) => {}
            }
        }
    }

    async fn try_once(&self, instance: &MediaInstance) -> Result<()> {
        instance.transition(InstanceState::Loading)?;
        instance
            .with_surface(|surface| surface.load())
            .map_err(|err| match err {
                PlaybackError::PlaybackFailure(message) => PlaybackError::LoadError(message),
                other => other,
            })?;

        match self.waiter.wait_until_ready(instance).await {
            Ok(_) => {}
            Err(ReadinessError::Disposed) => return Err(PlaybackError::Disposed),
            Err(err) => return Err(err.into()),
        }

        instance.transition(InstanceState::Ready)?;
        instance.with_surface(|surface| surface.rewind())?;

        let cancel = instance.cancellation();
        let rejection = core_async::select! {
            biased;
            _ = cancel.cancelled() => return Err(PlaybackError::Disposed),
            result = instance.surface().play() => match result {
                Ok(()) => {
                    instance.transition(InstanceState::Playing)?;
                    debug!(
                        request_id = %instance.request_id(),
                        instance_id = %instance.id(),
                        kind = %instance.kind(),
                        "Playback started from position 0"
                    );
                    return Ok(());
                }
                Err(rejection) => rejection,
            },
        };

        Err(self.classify_rejection(instance, rejection))
    }

    fn classify_rejection(&self, instance: &MediaInstance, rejection: PlayRejection) -> PlaybackError {
        match (instance.kind(), rejection) {
            (MediaKind::Audio, PlayRejection::PolicyDenied) => {
                debug!(
                    request_id = %instance.request_id(),
                    instance_id = %instance.id(),
                    "Audio blocked by autoplay policy; continuing without sound"
                );
                instance
                    .events()
                    .emit(CoreEvent::Media(MediaEvent::PlaybackDenied {
                        request_id: instance.request_id().as_u64(),
                        instance_id: instance.id().as_u64(),
                        kind: instance.kind(),
                    }))
                    .ok();
                PlaybackError::PlaybackPolicyDenied
            }
            (MediaKind::Visual, PlayRejection::PolicyDenied) => {
                PlaybackError::PlaybackFailure("visual playback blocked by policy".to_string())
            }
            (_, PlayRejection::Failed(message)) => PlaybackError::PlaybackFailure(message),
        }
    }
}
