//! # Feedback Controller
//!
//! Entry point hosts talk to. One controller owns everything that used to be
//! ambient state in a page script: the interaction gate, the interaction
//! counter, the re-entrancy flag and the live media registry.
//!
//! ## Flow
//!
//! ```text
//! InteractionEvent ──> gate ──> RequestFactory ──> register ──> driver task
//!                                                               │
//!              RequestHandle <── outcome ◄── PlaybackAttempt x2 ┘
//!                                                   │
//!                                   retain_until_disposed (keeper task)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_desktop::SimulatedMediaHost;
//! use core_playback::{FeedbackController, InteractionEvent, PlaybackConfig, Point};
//! use core_runtime::config::CoreConfig;
//!
//! let core = CoreConfig::builder()
//!     .media_host(Arc::new(SimulatedMediaHost::new()))
//!     .build()?;
//! let controller = FeedbackController::new(core, PlaybackConfig::default())?;
//! controller.start().await?;
//!
//! let click = InteractionEvent::click(Point::new(10.0, 10.0), controller.clock());
//! if let Some(handle) = controller.handle_interaction(click) {
//!     let outcome = handle.outcome().await;
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bridge_traits::{Clock, HostSignal};
use core_async::task::JoinHandle;
use core_runtime::config::CoreConfig;
use core_runtime::events::{
    CoreEvent, DisposeReason, EventBus, EventStream, IgnoreReason, RequestEvent,
};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::attempt::PlaybackAttempt;
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::gate::{InteractionGate, ReentrancyGate};
use crate::instance::MediaInstance;
use crate::lifecycle::ResourceLifecycleManager;
use crate::readiness::ReadinessWaiter;
use crate::request::{InteractionEvent, RequestFactory, RequestHandle, RequestOutcome};
use crate::visibility::VisibilityCoordinator;

struct Inner {
    core: CoreConfig,
    playback: PlaybackConfig,
    events: EventBus,
    gate: Arc<InteractionGate>,
    reentrancy: ReentrancyGate,
    factory: RequestFactory,
    attempt: PlaybackAttempt,
    lifecycle: ResourceLifecycleManager,
    visibility: VisibilityCoordinator,
    interactions: AtomicU64,
    torn_down: AtomicBool,
    host_watch: Mutex<Option<JoinHandle<()>>>,
}

/// Turns user interactions into self-cleaning audio + visual feedback.
///
/// Cloning is cheap; clones drive the same engine.
#[derive(Clone)]
pub struct FeedbackController {
    inner: Arc<Inner>,
}

impl FeedbackController {
    /// Validate both configurations and assemble the engine.
    pub fn new(core: CoreConfig, playback: PlaybackConfig) -> Result<Self> {
        core.validate()?;
        playback.validate()?;

        let events = EventBus::new(core.event_buffer_size);
        let gate = Arc::new(InteractionGate::new());
        let lifecycle = ResourceLifecycleManager::new(events.clone());
        let visibility = VisibilityCoordinator::new(lifecycle.clone(), events.clone());
        let factory = RequestFactory::new(
            Arc::clone(&core.media_host),
            core.capabilities,
            Arc::clone(&gate),
            &playback,
            events.clone(),
        );
        let attempt = PlaybackAttempt::new(
            ReadinessWaiter::new(playback.readiness_timeout()),
            playback.retry_policy(),
        );

        debug!(
            capabilities = ?core.capabilities,
            features = ?core.features,
            reentrancy_gate = playback.reentrancy_gate,
            "Feedback controller created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                reentrancy: ReentrancyGate::new(playback.reentrancy_gate),
                core,
                playback,
                events,
                gate,
                factory,
                attempt,
                lifecycle,
                visibility,
                interactions: AtomicU64::new(0),
                torn_down: AtomicBool::new(false),
                host_watch: Mutex::new(None),
            }),
        })
    }

    /// Start background work. Follows the host lifecycle bridge when
    /// `follow_host_lifecycle` is enabled.
    pub async fn start(&self) -> Result<()> {
        if self.inner.core.features.follow_host_lifecycle {
            self.follow_host_lifecycle().await?;
        }
        Ok(())
    }

    /// Subscribe to the configured [`HostLifecycle`](bridge_traits::HostLifecycle)
    /// and route its signals into this controller.
    ///
    /// Calling this again replaces the previous subscription.
    pub async fn follow_host_lifecycle(&self) -> Result<()> {
        let host = self.inner.core.host_lifecycle.clone().ok_or_else(|| {
            PlaybackError::Runtime(core_runtime::Error::capability_missing(
                "HostLifecycle",
                "No host lifecycle bridge configured",
            ))
        })?;

        let stream = host
            .subscribe()
            .await
            .map_err(core_runtime::Error::from)?;

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = VisibilityCoordinator::watch(stream, move |signal| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = FeedbackController { inner };
            match signal {
                HostSignal::Visibility { hidden } => {
                    controller.on_visibility_changed(hidden);
                }
                HostSignal::Teardown => {
                    controller.teardown();
                }
            }
        });

        if let Some(previous) = self.inner.host_watch.lock().replace(handle) {
            previous.abort();
        }

        if host.is_hidden() {
            self.on_visibility_changed(true);
        }
        info!("Following host lifecycle signals");
        Ok(())
    }

    /// Handle one user interaction.
    ///
    /// Returns `None` when the interaction does not start feedback: it was a
    /// `TouchStart`, the controller was torn down, or the re-entrancy gate is
    /// holding a previous request. Must be called within the async runtime.
    #[instrument(skip(self, event), fields(kind = ?event.kind))]
    pub fn handle_interaction(&self, event: InteractionEvent) -> Option<RequestHandle> {
        let inner = &self.inner;

        if inner.torn_down.load(Ordering::Acquire) {
            debug!("Interaction after teardown ignored");
            self.emit_ignored(IgnoreReason::TornDown);
            return None;
        }

        if event.trusted && inner.gate.mark_interacted() {
            debug!("First user interaction observed; audio unlocked");
        }

        if !event.kind.triggers_feedback() {
            self.prime_audio_if_needed(&event);
            return None;
        }

        let Some(permit) = inner.reentrancy.try_enter() else {
            debug!("Previous request still settling; interaction ignored");
            self.emit_ignored(IgnoreReason::Busy);
            return None;
        };

        let count = inner.interactions.fetch_add(1, Ordering::Relaxed) + 1;
        let request = inner.factory.create_request(event);
        let id = request.id();
        request.register(&inner.lifecycle, inner.playback.emergency_lifetime());
        debug!(request_id = %id, interaction = count, "Request registered");

        let driver_inner = Arc::clone(inner);
        let outcome = core_async::spawn(async move {
            let outcome: RequestOutcome = request
                .run(&driver_inner.attempt, &driver_inner.lifecycle)
                .await;
            driver_inner
                .events
                .emit(CoreEvent::Request(RequestEvent::Completed {
                    request_id: outcome.request_id.as_u64(),
                    visual_played: outcome.visual_played,
                    audio_played: outcome.audio_played(),
                }))
                .ok();
            drop(permit);

            core_async::spawn(request.retain_until_disposed());
            outcome
        });

        Some(RequestHandle { id, outcome })
    }

    fn prime_audio_if_needed(&self, event: &InteractionEvent) {
        let inner = &self.inner;
        if !event.trusted
            || !inner.core.features.prime_audio_on_touch
            || !inner.core.capabilities.should_prime_audio_on_touch()
        {
            return;
        }

        let host = Arc::clone(&inner.core.media_host);
        core_async::spawn(async move {
            match host.prime_audio().await {
                Ok(()) => debug!("Audio path primed on touch"),
                // Priming is best effort; the tap itself may still unlock audio.
                Err(e) => debug!(error = %e, "Audio priming failed"),
            }
        });
    }

    /// Pause or leave playing media alone as the host changes visibility.
    /// Returns how many instances were paused.
    pub fn on_visibility_changed(&self, hidden: bool) -> usize {
        if !self.inner.core.features.pause_on_hidden {
            debug!(hidden, "Visibility change ignored: pause_on_hidden disabled");
            return 0;
        }
        self.inner.visibility.on_visibility_changed(hidden)
    }

    /// Release every live instance, forget the interaction history and refuse
    /// further interactions. Returns how many instances were disposed.
    pub fn teardown(&self) -> usize {
        let inner = &self.inner;
        if inner.torn_down.swap(true, Ordering::AcqRel) {
            debug!("Teardown already performed");
            return 0;
        }

        let disposed = inner.visibility.teardown();
        inner.gate.reset();
        if let Some(watch) = inner.host_watch.lock().take() {
            watch.abort();
        }
        disposed
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::Acquire)
    }

    /// Interactions that produced a request.
    pub fn interaction_count(&self) -> u64 {
        self.inner.interactions.load(Ordering::Relaxed)
    }

    pub fn has_interacted(&self) -> bool {
        self.inner.gate.can_attempt_audio()
    }

    pub fn live_count(&self) -> usize {
        self.inner.lifecycle.live_count()
    }

    pub fn live_instances(&self) -> Vec<Arc<MediaInstance>> {
        self.inner.lifecycle.live_instances()
    }

    pub fn lifecycle(&self) -> &ResourceLifecycleManager {
        &self.inner.lifecycle
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub fn clock(&self) -> &dyn Clock {
        self.inner.core.clock.as_ref()
    }

    pub fn playback_config(&self) -> &PlaybackConfig {
        &self.inner.playback
    }

    /// Resolve once every media instance has been disposed.
    pub async fn wait_until_idle(&self) {
        self.inner.lifecycle.wait_until_idle().await;
    }

    fn emit_ignored(&self, reason: IgnoreReason) {
        self.inner
            .events
            .emit(CoreEvent::Request(RequestEvent::InteractionIgnored { reason }))
            .ok();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(watch) = self.host_watch.get_mut().take() {
            watch.abort();
        }
        if !self.torn_down.load(Ordering::Acquire) {
            let disposed = self.lifecycle.dispose_all(DisposeReason::Teardown);
            if disposed > 0 {
                warn!(disposed, "Controller dropped with live media; released");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{AudioOutcome, Point};
    use bridge_desktop::{ChannelHostLifecycle, SimulatedMediaHost, SurfaceScript};
    use bridge_traits::{CapabilityProfile, MediaKind, MediaSurface};
    use core_async::time::{sleep, Duration};

    fn controller_with(
        host: Arc<SimulatedMediaHost>,
        playback: PlaybackConfig,
    ) -> FeedbackController {
        let core = CoreConfig::builder().media_host(host).build().unwrap();
        FeedbackController::new(core, playback).unwrap()
    }

    fn click(controller: &FeedbackController) -> InteractionEvent {
        InteractionEvent::click(Point::new(1.0, 1.0), controller.clock())
    }

    #[core_async::test(start_paused)]
    async fn test_first_click_plays_audio_and_visual() {
        let host = Arc::new(SimulatedMediaHost::new());
        let controller = controller_with(host.clone(), PlaybackConfig::default());

        let handle = controller.handle_interaction(click(&controller)).unwrap();
        let outcome = handle.outcome().await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.audio, AudioOutcome::Played);
        assert_eq!(controller.interaction_count(), 1);
        assert_eq!(host.created_count(), 2);

        controller.wait_until_idle().await;
        assert_eq!(host.attached_count(), 0);
    }

    #[core_async::test(start_paused)]
    async fn test_synthetic_click_is_visual_only() {
        let host = Arc::new(SimulatedMediaHost::new());
        let controller = controller_with(host.clone(), PlaybackConfig::default());

        let event = click(&controller).synthetic();
        let outcome = controller
            .handle_interaction(event)
            .unwrap()
            .outcome()
            .await
            .unwrap();

        assert_eq!(outcome.audio, AudioOutcome::Skipped);
        assert!(outcome.visual_played);
        assert!(host.surfaces_of(MediaKind::Audio).is_empty());
    }

    #[core_async::test(start_paused)]
    async fn test_touch_start_marks_gate_without_request() {
        let host = Arc::new(SimulatedMediaHost::new());
        let core = CoreConfig::builder()
            .media_host(host.clone())
            .capabilities(CapabilityProfile::restricted_touch())
            .build()
            .unwrap();
        let controller = FeedbackController::new(core, PlaybackConfig::default()).unwrap();

        let touch = InteractionEvent::touch_start(Point::new(0.0, 0.0), controller.clock());
        assert!(controller.handle_interaction(touch).is_none());
        assert!(controller.has_interacted());
        assert_eq!(controller.interaction_count(), 0);

        sleep(Duration::from_millis(1)).await;
        assert_eq!(host.prime_count(), 1);
        assert_eq!(host.created_count(), 0);
    }

    #[core_async::test(start_paused)]
    async fn test_no_priming_on_desktop_profile() {
        let host = Arc::new(SimulatedMediaHost::new());
        let controller = controller_with(host.clone(), PlaybackConfig::default());

        let touch = InteractionEvent::touch_start(Point::new(0.0, 0.0), controller.clock());
        controller.handle_interaction(touch);
        sleep(Duration::from_millis(1)).await;
        assert_eq!(host.prime_count(), 0);
    }

    #[core_async::test(start_paused)]
    async fn test_reentrancy_gate_ignores_while_busy() {
        let host = Arc::new(SimulatedMediaHost::new());
        let playback = PlaybackConfig {
            reentrancy_gate: true,
            ..PlaybackConfig::default()
        };
        let controller = controller_with(host, playback);
        let mut events = controller.subscribe();

        let first = controller.handle_interaction(click(&controller));
        assert!(first.is_some());
        assert!(controller.handle_interaction(click(&controller)).is_none());

        first.unwrap().outcome().await.unwrap();
        assert!(controller.handle_interaction(click(&controller)).is_some());

        let busy = events
            .drain()
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    CoreEvent::Request(RequestEvent::InteractionIgnored {
                        reason: IgnoreReason::Busy
                    })
                )
            })
            .count();
        assert_eq!(busy, 1);
    }

    #[core_async::test(start_paused)]
    async fn test_teardown_refuses_further_interactions() {
        let host = Arc::new(SimulatedMediaHost::new());
        let controller = controller_with(host.clone(), PlaybackConfig::default());

        controller.handle_interaction(click(&controller));
        sleep(Duration::from_millis(5)).await;

        assert_eq!(controller.teardown(), 2);
        assert!(controller.is_torn_down());
        assert!(!controller.has_interacted());
        assert_eq!(host.attached_count(), 0);
        assert!(controller.handle_interaction(click(&controller)).is_none());
        assert_eq!(controller.teardown(), 0);
    }

    #[core_async::test(start_paused)]
    async fn test_pause_on_hidden_can_be_disabled() {
        let host = Arc::new(SimulatedMediaHost::new().with_audio_script(
            SurfaceScript::default().with_clip_duration(Duration::from_secs(5)),
        ));
        let core = CoreConfig::builder()
            .media_host(host.clone())
            .pause_on_hidden(false)
            .build()
            .unwrap();
        let controller = FeedbackController::new(core, PlaybackConfig::default()).unwrap();

        controller
            .handle_interaction(click(&controller))
            .unwrap()
            .outcome()
            .await
            .unwrap();
        assert_eq!(controller.on_visibility_changed(true), 0);
    }

    #[core_async::test(start_paused)]
    async fn test_follows_host_lifecycle() {
        let host = Arc::new(SimulatedMediaHost::new().with_audio_script(
            SurfaceScript::default().with_clip_duration(Duration::from_secs(5)),
        ));
        let lifecycle = Arc::new(ChannelHostLifecycle::new());
        let core = CoreConfig::builder()
            .media_host(host.clone())
            .host_lifecycle(lifecycle.clone())
            .follow_host_lifecycle(true)
            .build()
            .unwrap();
        let controller = FeedbackController::new(core, PlaybackConfig::default()).unwrap();
        controller.start().await.unwrap();
        assert_eq!(lifecycle.subscriber_count(), 1);

        controller
            .handle_interaction(click(&controller))
            .unwrap()
            .outcome()
            .await
            .unwrap();

        lifecycle.set_hidden(true);
        sleep(Duration::from_millis(1)).await;
        let audio = host.surfaces_of(MediaKind::Audio);
        assert!(audio[0].is_paused());

        lifecycle.teardown();
        sleep(Duration::from_millis(1)).await;
        assert!(controller.is_torn_down());
        assert_eq!(controller.live_count(), 0);
    }

    #[core_async::test]
    async fn test_follow_without_lifecycle_fails() {
        let host = Arc::new(SimulatedMediaHost::new());
        let controller = controller_with(host, PlaybackConfig::default());
        let result = controller.follow_host_lifecycle().await;
        assert!(matches!(
            result,
            Err(PlaybackError::Runtime(
                core_runtime::Error::CapabilityMissing { .. }
            ))
        ));
    }

    #[test]
    fn test_invalid_playback_config_rejected() {
        let host = Arc::new(SimulatedMediaHost::new());
        let core = CoreConfig::builder().media_host(host).build().unwrap();
        let playback = PlaybackConfig {
            max_retries: 0,
            ..PlaybackConfig::default()
        };
        assert!(matches!(
            FeedbackController::new(core, playback),
            Err(PlaybackError::Config(_))
        ));
    }
}
