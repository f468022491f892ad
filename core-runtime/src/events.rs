//! # Event Bus System
//!
//! Broadcasts lifecycle events of the feedback engine over
//! `core_async::sync::broadcast` so hosts, tests and diagnostics can observe
//! requests and media instances without coupling to engine internals.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wrapping per-domain enums (`RequestEvent`,
//!   `MediaEvent`, `HostEvent`)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Receiver wrapper with optional filtering
//!
//! ```text
//! ┌────────────────┐  emit   ┌──────────┐  subscribe  ┌────────────┐
//! │ Controller     ├────────>│          ├────────────>│ Host UI    │
//! └────────────────┘         │ EventBus │             └────────────┘
//! ┌────────────────┐  emit   │          │  subscribe  ┌────────────┐
//! │ Lifecycle mgr  ├────────>│          ├────────────>│ Test probe │
//! └────────────────┘         └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, RequestEvent};
//!
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//! bus.emit(CoreEvent::Request(RequestEvent::Created {
//!     request_id: 1,
//!     with_audio: false,
//! }))
//! .ok();
//! assert!(rx.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; engine code ignores that with
//! `.ok()` because observation is optional.

use bridge_traits::MediaKind;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// A burst of taps produces roughly ten events per request; the default
/// absorbs a dozen rapid taps before slow subscribers start lagging.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 128;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Interaction → request bookkeeping
    Request(RequestEvent),
    /// Per media instance lifecycle
    Media(MediaEvent),
    /// Host visibility and teardown
    Host(HostEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Request(e) => e.description(),
            CoreEvent::Media(e) => e.description(),
            CoreEvent::Host(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Media(MediaEvent::EmergencyReaped { .. }) => EventSeverity::Warning,
            CoreEvent::Media(MediaEvent::Disposed {
                reason: DisposeReason::Errored,
                ..
            }) => EventSeverity::Warning,
            CoreEvent::Request(RequestEvent::Completed {
                visual_played: false,
                ..
            }) => EventSeverity::Warning,
            CoreEvent::Request(RequestEvent::Created { .. })
            | CoreEvent::Request(RequestEvent::Completed { .. })
            | CoreEvent::Host(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Request the event belongs to, when it is scoped to one.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            CoreEvent::Request(RequestEvent::Created { request_id, .. })
            | CoreEvent::Request(RequestEvent::AudioSkipped { request_id })
            | CoreEvent::Request(RequestEvent::Completed { request_id, .. })
            | CoreEvent::Media(MediaEvent::StateChanged { request_id, .. })
            | CoreEvent::Media(MediaEvent::PlaybackDenied { request_id, .. })
            | CoreEvent::Media(MediaEvent::Disposed { request_id, .. })
            | CoreEvent::Media(MediaEvent::EmergencyReaped { request_id, .. }) => Some(*request_id),
            _ => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Request Events
// ============================================================================

/// Why an interaction did not produce a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Re-entrancy gate is on and a previous request is still being set up.
    Busy,
    /// The controller was torn down.
    TornDown,
}

/// Events describing interaction handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RequestEvent {
    /// An interaction was dropped without creating a request.
    InteractionIgnored { reason: IgnoreReason },
    /// A request was created for an interaction.
    Created { request_id: u64, with_audio: bool },
    /// Audio was not attempted because no interaction had been observed yet.
    AudioSkipped { request_id: u64 },
    /// Every playback attempt of the request settled.
    Completed {
        request_id: u64,
        visual_played: bool,
        audio_played: bool,
    },
}

impl RequestEvent {
    fn description(&self) -> &str {
        match self {
            RequestEvent::InteractionIgnored { .. } => "Interaction ignored",
            RequestEvent::Created { .. } => "Playback request created",
            RequestEvent::AudioSkipped { .. } => "Audio skipped before first interaction",
            RequestEvent::Completed { .. } => "Playback request settled",
        }
    }
}

// ============================================================================
// Media Events
// ============================================================================

/// What caused a media instance to be released.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DisposeReason {
    /// The clip finished on its own.
    Ended,
    /// Loading or playback failed for good.
    Errored,
    /// The emergency lifetime elapsed without a completion signal.
    EmergencyTimeout,
    /// Host teardown swept every live instance.
    Teardown,
    /// A caller disposed the instance directly.
    Explicit,
}

impl fmt::Display for DisposeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DisposeReason::Ended => "ended",
            DisposeReason::Errored => "errored",
            DisposeReason::EmergencyTimeout => "emergency_timeout",
            DisposeReason::Teardown => "teardown",
            DisposeReason::Explicit => "explicit",
        };
        f.write_str(label)
    }
}

/// Events related to individual media instances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MediaEvent {
    /// The instance moved between lifecycle states.
    StateChanged {
        request_id: u64,
        instance_id: u64,
        kind: MediaKind,
        from: String,
        to: String,
    },
    /// The platform refused audio because of its autoplay policy.
    PlaybackDenied {
        request_id: u64,
        instance_id: u64,
        kind: MediaKind,
    },
    /// The instance was detached and removed from the live registry.
    Disposed {
        request_id: u64,
        instance_id: u64,
        kind: MediaKind,
        reason: DisposeReason,
    },
    /// The emergency reaper had to release an instance.
    EmergencyReaped {
        request_id: u64,
        instance_id: u64,
        kind: MediaKind,
        lifetime_ms: u64,
    },
}

impl MediaEvent {
    fn description(&self) -> &str {
        match self {
            MediaEvent::StateChanged { .. } => "Media instance state changed",
            MediaEvent::PlaybackDenied { .. } => "Playback denied by autoplay policy",
            MediaEvent::Disposed { .. } => "Media instance disposed",
            MediaEvent::EmergencyReaped { .. } => "Media instance force-disposed by reaper",
        }
    }
}

// ============================================================================
// Host Events
// ============================================================================

/// Events triggered by host lifecycle signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum HostEvent {
    /// Visibility changed; `paused` counts instances paused as a result.
    VisibilityChanged { hidden: bool, paused: usize },
    /// Teardown swept the registry.
    TornDown { disposed: usize },
}

impl HostEvent {
    fn description(&self) -> &str {
        match self {
            HostEvent::VisibilityChanged { .. } => "Host visibility changed",
            HostEvent::TornDown { .. } => "Controller torn down",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender, so any component can publish. Each
/// [`EventBus::subscribe`] call creates an independent receiver that sees
/// events emitted after the call.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified per-subscriber buffer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let media_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Media(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching events are currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every matching event currently buffered, skipping lag markers.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn disposed(request_id: u64, reason: DisposeReason) -> CoreEvent {
        CoreEvent::Media(MediaEvent::Disposed {
            request_id,
            instance_id: request_id * 10,
            kind: MediaKind::Visual,
            reason,
        })
    }

    #[test]
    fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_event_emission_no_subscribers() {
        let bus = EventBus::default();
        let event = CoreEvent::Host(HostEvent::TornDown { disposed: 0 });
        assert!(bus.emit(event).is_err());
    }

    #[core_async::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Request(RequestEvent::Created {
            request_id: 4,
            with_audio: true,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[core_async::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Media(MediaEvent::Disposed { .. })));

        bus.emit(CoreEvent::Request(RequestEvent::AudioSkipped { request_id: 1 }))
            .ok();
        let wanted = disposed(1, DisposeReason::Ended);
        bus.emit(wanted.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), wanted);
        assert!(stream.try_recv().is_none());
    }

    #[core_async::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(disposed(i, DisposeReason::Ended)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_drain_skips_lag_marker() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());
        for i in 0..4 {
            bus.emit(disposed(i, DisposeReason::Teardown)).ok();
        }
        let events = stream.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].request_id(), Some(3));
    }

    #[test]
    fn test_event_severity() {
        let reaped = CoreEvent::Media(MediaEvent::EmergencyReaped {
            request_id: 1,
            instance_id: 2,
            kind: MediaKind::Audio,
            lifetime_ms: 10_000,
        });
        assert_eq!(reaped.severity(), EventSeverity::Warning);

        let failed = CoreEvent::Request(RequestEvent::Completed {
            request_id: 1,
            visual_played: false,
            audio_played: false,
        });
        assert_eq!(failed.severity(), EventSeverity::Warning);

        let ok = CoreEvent::Request(RequestEvent::Completed {
            request_id: 1,
            visual_played: true,
            audio_played: false,
        });
        assert_eq!(ok.severity(), EventSeverity::Info);

        let denied = CoreEvent::Media(MediaEvent::PlaybackDenied {
            request_id: 1,
            instance_id: 2,
            kind: MediaKind::Audio,
        });
        assert_eq!(denied.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description_and_scope() {
        let event = CoreEvent::Request(RequestEvent::InteractionIgnored {
            reason: IgnoreReason::Busy,
        });
        assert_eq!(event.description(), "Interaction ignored");
        assert_eq!(event.request_id(), None);
        assert_eq!(disposed(9, DisposeReason::Explicit).request_id(), Some(9));
    }

    #[core_async::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let handles: Vec<_> = (0..2)
            .map(|n| {
                let bus = bus.clone();
                core_async::task::spawn(async move {
                    for i in 0..10 {
                        bus.emit(disposed(n * 100 + i, DisposeReason::Ended)).ok();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Media(MediaEvent::StateChanged {
            request_id: 3,
            instance_id: 7,
            kind: MediaKind::Audio,
            from: "loading".to_string(),
            to: "ready".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"audio\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_dispose_reason_display() {
        assert_eq!(DisposeReason::EmergencyTimeout.to_string(), "emergency_timeout");
        assert_eq!(DisposeReason::Teardown.to_string(), "teardown");
    }
}
