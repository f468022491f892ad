//! # Readiness Waiting
//!
//! Turns a surface's `CanPlay`/`Error` signals into a single awaitable
//! result bounded by a timeout. The signal subscription is a local receiver,
//! so it is released on every exit path (ready, error, timeout, disposal, or
//! the future being dropped).

use std::time::Duration;

use bridge_traits::SurfaceSignal;
use core_async::sync::broadcast::error::RecvError;
use thiserror::Error;
use tracing::trace;

use crate::error::PlaybackError;
use crate::instance::MediaInstance;

/// The surface can start playing immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready;

/// Why readiness was not reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("no readiness signal within {0:?}")]
    TimedOut(Duration),

    #[error("load failed: {0}")]
    LoadError(String),

    #[error("instance disposed while waiting")]
    Disposed,
}

impl From<ReadinessError> for PlaybackError {
    fn from(err: ReadinessError) -> Self {
        match err {
            ReadinessError::TimedOut(after) => PlaybackError::LoadTimeout(after),
            ReadinessError::LoadError(message) => PlaybackError::LoadError(message),
            ReadinessError::Disposed => PlaybackError::Disposed,
        }
    }
}

/// Waits for media instances to become playable.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessWaiter {
    timeout: Duration,
}

impl ReadinessWaiter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn wait_until_ready(
        &self,
        instance: &MediaInstance,
    ) -> Result<Ready, ReadinessError> {
        wait_until_ready(instance, self.timeout).await
    }
}

/// Resolve once `instance` can play, it reports a load error, `timeout`
/// elapses, or it is disposed.
pub async fn wait_until_ready(
    instance: &MediaInstance,
    timeout: Duration,
) -> Result<Ready, ReadinessError> {
    let surface = instance.surface();
    let cancel = instance.cancellation();

    if cancel.is_cancelled() {
        return Err(ReadinessError::Disposed);
    }

    // Subscribe before checking so a signal racing the check is not lost.
    let mut signals = surface.subscribe();
    if surface.is_ready() {
        trace!(instance_id = %instance.id(), "Already ready");
        return Ok(Ready);
    }

    let signal_wait = async {
        loop {
            match signals.recv().await {
                Ok(SurfaceSignal::CanPlay) => return Ok(Ready),
                Ok(SurfaceSignal::Error { message }) => {
                    return Err(ReadinessError::LoadError(message))
                }
                Ok(SurfaceSignal::Ended) => continue,
                Err(RecvError::Lagged(_)) => {
                    if surface.is_ready() {
                        return Ok(Ready);
                    }
                }
                Err(RecvError::Closed) => {
                    return Err(ReadinessError::LoadError(
                        "surface signal channel closed".to_string(),
                    ))
                }
            }
        }
    };

    core_async::select! {
        biased;
        _ = cancel.cancelled() => Err(ReadinessError::Disposed),
        result = core_async::time::timeout(timeout, signal_wait) => {
            result.unwrap_or(Err(ReadinessError::TimedOut(timeout)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceId;
    use crate::request::RequestId;
    use bridge_desktop::{SimulatedMediaHost, SurfaceScript};
    use bridge_traits::{MediaHost, MediaKind, SurfaceSpec};
    use core_async::time::{sleep, Instant};
    use core_runtime::events::{DisposeReason, EventBus};
    use std::sync::Arc;

    fn instance(host: &SimulatedMediaHost) -> Arc<MediaInstance> {
        let surface = host
            .create_surface(SurfaceSpec::new(MediaKind::Visual, "clip.gif"))
            .unwrap();
        Arc::new(MediaInstance::new(
            InstanceId::new(7),
            RequestId::new(3),
            MediaKind::Visual,
            "clip.gif",
            surface,
            EventBus::new(16),
        ))
    }

    #[core_async::test(start_paused)]
    async fn test_resolves_on_can_play() {
        let host = SimulatedMediaHost::new()
            .with_visual_script(SurfaceScript::ready_after(Duration::from_millis(50)));
        let instance = instance(&host);
        instance.surface().load().unwrap();

        let started = Instant::now();
        let waiter = ReadinessWaiter::new(Duration::from_secs(2));
        assert_eq!(waiter.wait_until_ready(&instance).await, Ok(Ready));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[core_async::test(start_paused)]
    async fn test_already_ready_resolves_immediately() {
        let host = SimulatedMediaHost::new();
        let instance = instance(&host);
        instance.surface().load().unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(instance.surface().is_ready());

        let started = Instant::now();
        let result = wait_until_ready(&instance, Duration::from_secs(2)).await;
        assert_eq!(result, Ok(Ready));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[core_async::test(start_paused)]
    async fn test_times_out() {
        let host = SimulatedMediaHost::new().with_visual_script(SurfaceScript::never_ready());
        let instance = instance(&host);
        instance.surface().load().unwrap();

        let started = Instant::now();
        let result = wait_until_ready(&instance, Duration::from_millis(2000)).await;
        assert_eq!(
            result,
            Err(ReadinessError::TimedOut(Duration::from_millis(2000)))
        );
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[core_async::test(start_paused)]
    async fn test_load_error() {
        let host = SimulatedMediaHost::new()
            .with_visual_script(SurfaceScript::default().with_failing_loads(1));
        let instance = instance(&host);
        instance.surface().load().unwrap();

        let result = wait_until_ready(&instance, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ReadinessError::LoadError(_))));
    }

    #[core_async::test(start_paused)]
    async fn test_disposal_aborts_wait() {
        let host = SimulatedMediaHost::new().with_visual_script(SurfaceScript::never_ready());
        let instance = instance(&host);
        instance.surface().load().unwrap();

        let disposer = Arc::clone(&instance);
        core_async::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            disposer.dispose(DisposeReason::Explicit);
        });

        let started = Instant::now();
        let result = wait_until_ready(&instance, Duration::from_secs(2)).await;
        assert_eq!(result, Err(ReadinessError::Disposed));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[core_async::test(start_paused)]
    async fn test_subscription_released_on_every_path() {
        let host = SimulatedMediaHost::new().with_visual_script(SurfaceScript::never_ready());
        let instance = instance(&host);

        let surfaces = host.surfaces();
        let simulated = &surfaces[0];

        let _ = wait_until_ready(&instance, Duration::from_millis(10)).await;
        assert_eq!(simulated.subscriber_count(), 0);

        simulated.emit(SurfaceSignal::CanPlay);
        let _ = wait_until_ready(&instance, Duration::from_millis(10)).await;
        assert_eq!(simulated.subscriber_count(), 0);
    }

    #[test]
    fn test_error_conversion() {
        let err: PlaybackError = ReadinessError::TimedOut(Duration::from_millis(5)).into();
        assert!(matches!(err, PlaybackError::LoadTimeout(_)));
        assert!(err.is_retryable());
    }
}
