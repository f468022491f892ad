//! # Playback Requests
//!
//! One [`InteractionEvent`] becomes one [`PlaybackRequest`]: exactly one
//! visual instance plus an audio instance when the interaction gate allows
//! audio. The request owns its instances; the lifecycle manager and the
//! visibility coordinator only track them weakly.
//!
//! [`PlaybackRequest::run`] drives both attempts concurrently and reports a
//! [`RequestOutcome`]. [`PlaybackRequest::retain_until_disposed`] then keeps
//! the instances alive until every one of them has been disposed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_traits::{CapabilityProfile, Clock, MediaHost, MediaKind, SurfaceSpec};
use chrono::{DateTime, Utc};
use core_async::task::JoinHandle;
use core_async::time::{sleep, Duration, Instant};
use core_runtime::events::{CoreEvent, DisposeReason, EventBus, RequestEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attempt::PlaybackAttempt;
use crate::config::PlaybackConfig;
use crate::error::{FailureKind, PlaybackError};
use crate::gate::InteractionGate;
use crate::instance::{InstanceId, MediaInstance};
use crate::lifecycle::ResourceLifecycleManager;

/// Sequence number of a request, unique per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Interaction Input
// ============================================================================

/// Kind of user input delivered by the host UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Click,
    TouchEnd,
    /// Start of a touch. Counts as an interaction and may unlock audio, but
    /// the feedback itself fires on the matching `TouchEnd`/`Click`.
    TouchStart,
}

impl InteractionKind {
    /// Whether this kind of event produces feedback.
    pub fn triggers_feedback(&self) -> bool {
        matches!(self, InteractionKind::Click | InteractionKind::TouchEnd)
    }
}

/// Pointer position in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A discrete user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub position: Point,
    pub timestamp: DateTime<Utc>,
    /// `false` for events synthesised by the host rather than produced by a
    /// user gesture. Synthetic events never open the interaction gate.
    #[serde(default = "default_trusted")]
    pub trusted: bool,
}

fn default_trusted() -> bool {
    true
}

impl InteractionEvent {
    pub fn new(kind: InteractionKind, position: Point, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            position,
            timestamp,
            trusted: true,
        }
    }

    pub fn click(position: Point, clock: &dyn Clock) -> Self {
        Self::new(InteractionKind::Click, position, clock.now())
    }

    pub fn touch_start(position: Point, clock: &dyn Clock) -> Self {
        Self::new(InteractionKind::TouchStart, position, clock.now())
    }

    pub fn touch_end(position: Point, clock: &dyn Clock) -> Self {
        Self::new(InteractionKind::TouchEnd, position, clock.now())
    }

    /// Mark the event as host-synthesised.
    pub fn synthetic(mut self) -> Self {
        self.trusted = false;
        self
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// What happened to the audio half of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum AudioOutcome {
    Played,
    /// Not attempted: no user interaction had been observed.
    Skipped,
    Failed(FailureKind),
}

/// Result of driving one request, available once both attempts settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub request_id: RequestId,
    pub visual_played: bool,
    pub audio: AudioOutcome,
}

impl RequestOutcome {
    /// The request counts as successful when the visual feedback was shown,
    /// whatever happened to the audio.
    pub fn succeeded(&self) -> bool {
        self.visual_played
    }

    pub fn audio_played(&self) -> bool {
        self.audio == AudioOutcome::Played
    }
}

/// Handle returned for every accepted interaction.
#[derive(Debug)]
pub struct RequestHandle {
    pub id: RequestId,
    pub outcome: JoinHandle<RequestOutcome>,
}

impl RequestHandle {
    /// Wait for the request to settle. `None` if the driver task was
    /// cancelled or panicked.
    pub async fn outcome(self) -> Option<RequestOutcome> {
        self.outcome.await.ok()
    }
}

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Present,
    Skipped,
    Unavailable,
}

/// The unit of work created per interaction.
#[derive(Debug)]
pub struct PlaybackRequest {
    id: RequestId,
    created_at: Instant,
    trigger: InteractionEvent,
    audio: Option<Arc<MediaInstance>>,
    visual: Option<Arc<MediaInstance>>,
    audio_slot: Slot,
    visual_clip: Duration,
}

impl PlaybackRequest {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn trigger(&self) -> &InteractionEvent {
        &self.trigger
    }

    pub fn audio(&self) -> Option<&Arc<MediaInstance>> {
        self.audio.as_ref()
    }

    pub fn visual(&self) -> Option<&Arc<MediaInstance>> {
        self.visual.as_ref()
    }

    /// Instances owned by the request (0 to 2).
    pub fn instances(&self) -> impl Iterator<Item = &Arc<MediaInstance>> {
        self.audio.iter().chain(self.visual.iter())
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Every instance reached `Disposed`.
    pub fn is_settled(&self) -> bool {
        self.instances().all(|instance| instance.is_disposed())
    }

    /// Register every instance with `lifecycle`, arming its emergency timer.
    pub fn register(&self, lifecycle: &ResourceLifecycleManager, max_lifetime: Duration) {
        for instance in self.instances() {
            lifecycle.register(instance, max_lifetime);
        }
    }

    /// Run the audio and visual attempts concurrently. Failed instances are
    /// disposed immediately; playing ones are left to their completion
    /// signal or the reaper. A playing visual is ended `visual_clip` after it
    /// started, whatever the audio attempt is still doing.
    pub async fn run(
        &self,
        attempt: &PlaybackAttempt,
        lifecycle: &ResourceLifecycleManager,
    ) -> RequestOutcome {
        let audio = async {
            match (&self.audio, self.audio_slot) {
                (Some(instance), _) => match settle(attempt, lifecycle, instance).await {
                    Ok(()) => AudioOutcome::Played,
                    Err(err) => AudioOutcome::Failed(err.failure_kind()),
                },
                (None, Slot::Unavailable) => AudioOutcome::Failed(FailureKind::SurfaceUnavailable),
                (None, _) => AudioOutcome::Skipped,
            }
        };

        let visual = async {
            match &self.visual {
                Some(instance) => {
                    let played = settle(attempt, lifecycle, instance).await.is_ok();
                    if played {
                        let clip = self.visual_clip;
                        end_visual_after(Arc::clone(instance), lifecycle.clone(), clip);
                    }
                    played
                }
                None => false,
            }
        };

        let (audio, visual_played) = futures::join!(audio, visual);

        let outcome = RequestOutcome {
            request_id: self.id,
            visual_played,
            audio,
        };

        if outcome.succeeded() {
            info!(
                request_id = %self.id,
                audio = ?outcome.audio,
                "Feedback started"
            );
        } else {
            warn!(request_id = %self.id, audio = ?outcome.audio, "Visual feedback failed");
        }
        outcome
    }

    /// Keep the instances alive until all of them are disposed.
    ///
    /// Completion is driven elsewhere: surface signals, the visual clip
    /// timer armed in [`run`](Self::run) and the emergency reaper.
    pub async fn retain_until_disposed(self) {
        for instance in self.instances() {
            instance.cancellation().cancelled().await;
        }
        debug!(request_id = %self.id, "Request released");
    }
}

/// A visual has no end signal of its own; finish it after one clip.
fn end_visual_after(
    visual: Arc<MediaInstance>,
    lifecycle: ResourceLifecycleManager,
    clip: Duration,
) {
    core_async::spawn(async move {
        let cancel = visual.cancellation().clone();
        core_async::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = sleep(clip) => {
                lifecycle.complete(&visual, DisposeReason::Ended);
            }
        }
    });
}

async fn settle(
    attempt: &PlaybackAttempt,
    lifecycle: &ResourceLifecycleManager,
    instance: &Arc<MediaInstance>,
) -> Result<(), PlaybackError> {
    let result = attempt.run_detailed(instance).await;
    match &result {
        Ok(()) => {
            lifecycle.playback_started(instance);
        }
        Err(PlaybackError::Disposed) => {}
        Err(_) => {
            lifecycle.complete(instance, DisposeReason::Errored);
        }
    }
    result
}

// ============================================================================
// Factory
// ============================================================================

/// Creates requests and their media instances.
pub struct RequestFactory {
    host: Arc<dyn MediaHost>,
    capabilities: CapabilityProfile,
    gate: Arc<InteractionGate>,
    events: EventBus,
    audio_source: String,
    visual_source: String,
    audio_volume: f32,
    visual_clip: Duration,
    next_request: AtomicU64,
    next_instance: AtomicU64,
}

impl RequestFactory {
    pub fn new(
        host: Arc<dyn MediaHost>,
        capabilities: CapabilityProfile,
        gate: Arc<InteractionGate>,
        config: &PlaybackConfig,
        events: EventBus,
    ) -> Self {
        Self {
            host,
            capabilities,
            gate,
            events,
            audio_source: config.audio_source_uri.clone(),
            visual_source: config.visual_source_uri.clone(),
            audio_volume: config.audio_volume,
            visual_clip: config.visual_clip(),
            next_request: AtomicU64::new(1),
            next_instance: AtomicU64::new(1),
        }
    }

    /// Build the request for `trigger`.
    ///
    /// Always tries to create one visual instance; adds an audio instance
    /// only when the interaction gate is open. A kind the host cannot
    /// provide a surface for is left out of the request.
    pub fn create_request(&self, trigger: InteractionEvent) -> PlaybackRequest {
        let id = RequestId::new(self.next_request.fetch_add(1, Ordering::Relaxed));

        let visual = self.create_instance(id, MediaKind::Visual, &self.visual_source);

        let (audio, audio_slot) = if self.gate.can_attempt_audio() {
            match self.create_instance(id, MediaKind::Audio, &self.audio_source) {
                Some(instance) => (Some(instance), Slot::Present),
                None => (None, Slot::Unavailable),
            }
        } else {
            debug!(request_id = %id, "Skipping audio: no user interaction yet");
            self.events
                .emit(CoreEvent::Request(RequestEvent::AudioSkipped {
                    request_id: id.as_u64(),
                }))
                .ok();
            (None, Slot::Skipped)
        };

        self.events
            .emit(CoreEvent::Request(RequestEvent::Created {
                request_id: id.as_u64(),
                with_audio: audio.is_some(),
            }))
            .ok();

        PlaybackRequest {
            id,
            created_at: Instant::now(),
            trigger,
            audio,
            visual,
            audio_slot,
            visual_clip: self.visual_clip,
        }
    }

    fn create_instance(
        &self,
        request_id: RequestId,
        kind: MediaKind,
        source: &str,
    ) -> Option<Arc<MediaInstance>> {
        let mut spec = SurfaceSpec::new(kind, source).with_preload(self.capabilities.preload_hint());
        if kind == MediaKind::Audio {
            spec = spec.with_volume(self.audio_volume);
        }

        match self.host.create_surface(spec) {
            Ok(surface) => {
                let id = InstanceId::new(self.next_instance.fetch_add(1, Ordering::Relaxed));
                Some(Arc::new(MediaInstance::new(
                    id,
                    request_id,
                    kind,
                    source,
                    surface,
                    self.events.clone(),
                )))
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    kind = %kind,
                    source = core_runtime::logging::source_label(source),
                    error = %err,
                    "Host could not create media surface"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::{SimulatedMediaHost, SurfaceScript};
    use bridge_traits::{FixedClock, PreloadHint};
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn factory(host: Arc<SimulatedMediaHost>, gate: Arc<InteractionGate>) -> RequestFactory {
        RequestFactory::new(
            host,
            CapabilityProfile::desktop(),
            gate,
            &PlaybackConfig::default(),
            EventBus::new(32),
        )
    }

    #[test]
    fn test_closed_gate_creates_visual_only() {
        let host = Arc::new(SimulatedMediaHost::new());
        let factory = factory(host.clone(), Arc::new(InteractionGate::new()));

        let request = factory.create_request(InteractionEvent::click(Point::default(), &clock()));

        assert!(!request.has_audio());
        assert!(request.visual().is_some());
        assert_eq!(request.instances().count(), 1);
        assert_eq!(host.surfaces_of(MediaKind::Audio).len(), 0);
    }

    #[test]
    fn test_open_gate_creates_audio_and_visual() {
        let host = Arc::new(SimulatedMediaHost::new());
        let gate = Arc::new(InteractionGate::new());
        gate.mark_interacted();
        let factory = factory(host.clone(), gate);

        let request = factory.create_request(InteractionEvent::click(Point::default(), &clock()));

        assert!(request.has_audio());
        assert_eq!(request.instances().count(), 2);
        let audio_surfaces = host.surfaces_of(MediaKind::Audio);
        let audio = &audio_surfaces[0];
        assert_eq!(audio.spec().volume, 0.7);
        assert_eq!(audio.spec().source_uri, "assets/lizard.m4a");
    }

    #[test]
    fn test_request_ids_are_monotonic() {
        let host = Arc::new(SimulatedMediaHost::new());
        let factory = factory(host, Arc::new(InteractionGate::new()));

        let ids: Vec<u64> = (0..4)
            .map(|_| {
                factory
                    .create_request(InteractionEvent::click(Point::default(), &clock()))
                    .id()
                    .as_u64()
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_surface_failure_skips_kind() {
        let host = Arc::new(
            SimulatedMediaHost::new()
                .with_audio_script(SurfaceScript::default().with_create_error("no codec")),
        );
        let gate = Arc::new(InteractionGate::new());
        gate.mark_interacted();
        let factory = factory(host, gate);

        let request = factory.create_request(InteractionEvent::click(Point::default(), &clock()));
        assert!(!request.has_audio());
        assert!(request.visual().is_some());
    }

    #[test]
    fn test_restricted_profile_requests_explicit_preload() {
        let host = Arc::new(SimulatedMediaHost::new());
        let factory = RequestFactory::new(
            host.clone(),
            CapabilityProfile::restricted_touch(),
            Arc::new(InteractionGate::new()),
            &PlaybackConfig::default(),
            EventBus::new(8),
        );
        factory.create_request(InteractionEvent::touch_end(Point::new(4.0, 2.0), &clock()));
        assert_eq!(host.surfaces()[0].preload(), PreloadHint::Explicit);
    }

    #[test]
    fn test_outcome_success_depends_on_visual_only() {
        let outcome = RequestOutcome {
            request_id: RequestId::new(1),
            visual_played: true,
            audio: AudioOutcome::Failed(FailureKind::PolicyDenied),
        };
        assert!(outcome.succeeded());
        assert!(!outcome.audio_played());

        let outcome = RequestOutcome {
            visual_played: false,
            audio: AudioOutcome::Played,
            ..outcome
        };
        assert!(!outcome.succeeded());
    }

    #[test]
    fn test_interaction_kinds() {
        assert!(InteractionKind::Click.triggers_feedback());
        assert!(InteractionKind::TouchEnd.triggers_feedback());
        assert!(!InteractionKind::TouchStart.triggers_feedback());

        let event = InteractionEvent::click(Point::default(), &clock()).synthetic();
        assert!(!event.trusted);
    }
}
