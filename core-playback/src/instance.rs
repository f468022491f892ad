//! # Media Instances
//!
//! A [`MediaInstance`] is one ephemeral audio or visual playback unit bound to
//! a host [`MediaSurface`]. It carries its own state machine:
//!
//! ```text
//! Created ─> Loading ─> Ready ─> Playing ─> Ended ──┐
//!              ^  │       │         │               ├─> Disposed
//!              └──┴───────┘         └─────> Errored ┘
//!                (retry)
//! ```
//!
//! Every non-disposed state may jump straight to `Disposed`; `Disposed` is
//! terminal. All transitions of one instance go through its state mutex, so
//! two tasks can never interleave changes on the same instance.
//!
//! Disposal cancels the instance's [`CancellationToken`]; in-flight attempts
//! select against it and stop without touching the surface again.

use std::fmt;
use std::sync::Arc;

use bridge_traits::{error::Result as BridgeResult, MediaKind, MediaSurface};
use core_async::time::{Duration, Instant};
use core_async::CancellationToken;
use core_runtime::events::{CoreEvent, DisposeReason, EventBus, MediaEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{PlaybackError, Result};
use crate::request::RequestId;

/// Identifier of a media instance, unique per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a media instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Created,
    Loading,
    Ready,
    Playing,
    Ended,
    Errored,
    Disposed,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Created => "created",
            InstanceState::Loading => "loading",
            InstanceState::Ready => "ready",
            InstanceState::Playing => "playing",
            InstanceState::Ended => "ended",
            InstanceState::Errored => "errored",
            InstanceState::Disposed => "disposed",
        }
    }

    /// `Ended`, `Errored` or `Disposed`: the surface must not stay attached.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            InstanceState::Ended | InstanceState::Errored | InstanceState::Disposed
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: InstanceState) -> bool {
        use InstanceState::*;

        match (self, next) {
            (Disposed, _) => false,
            (_, Disposed) => true,
            (Created, Loading) => true,
            (Loading, Loading | Ready | Errored) => true,
            (Ready, Loading | Playing | Errored) => true,
            (Playing, Ended | Errored) => true,
            _ => false,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct InstanceInner {
    state: InstanceState,
    attempts: u32,
    playing_since: Option<Instant>,
    // `Ended` seen while play was still being confirmed.
    pending_end: bool,
}

/// One ephemeral, disposable audio or visual playback unit.
pub struct MediaInstance {
    id: InstanceId,
    request_id: RequestId,
    kind: MediaKind,
    source: String,
    surface: Arc<dyn MediaSurface>,
    inner: Mutex<InstanceInner>,
    created_at: Instant,
    cancel: CancellationToken,
    events: EventBus,
}

impl MediaInstance {
    pub(crate) fn new(
        id: InstanceId,
        request_id: RequestId,
        kind: MediaKind,
        source: impl Into<String>,
        surface: Arc<dyn MediaSurface>,
        events: EventBus,
    ) -> Self {
        Self {
            id,
            request_id,
            kind,
            source: source.into(),
            surface,
            inner: Mutex::new(InstanceInner {
                state: InstanceState::Created,
                attempts: 0,
                playing_since: None,
                pending_end: false,
            }),
            created_at: Instant::now(),
            cancel: CancellationToken::new(),
            events,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn surface(&self) -> &Arc<dyn MediaSurface> {
        &self.surface
    }

    pub fn state(&self) -> InstanceState {
        self.inner.lock().state
    }

    /// Failed load/play attempts so far.
    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time spent in `Playing`, if the instance got there.
    pub fn playing_for(&self) -> Option<Duration> {
        self.inner.lock().playing_since.map(|since| since.elapsed())
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == InstanceState::Disposed
    }

    /// Token cancelled when the instance is disposed.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Move to `next`, returning the previous state.
    pub(crate) fn transition(&self, next: InstanceState) -> Result<InstanceState> {
        let from = {
            let mut inner = self.inner.lock();
            let from = inner.state;
            if from == InstanceState::Disposed {
                return Err(PlaybackError::Disposed);
            }
            if !from.can_transition_to(next) {
                return Err(PlaybackError::InvalidTransition { from, to: next });
            }
            inner.state = next;
            inner.playing_since = match next {
                InstanceState::Playing => Some(Instant::now()),
                _ => inner.playing_since,
            };
            from
        };

        trace!(
            request_id = %self.request_id,
            instance_id = %self.id,
            kind = %self.kind,
            from = %from,
            to = %next,
            "Instance state changed"
        );
        self.emit_state_change(from, next);
        Ok(from)
    }

    /// Count one failed attempt; returns the new total.
    pub(crate) fn record_failed_attempt(&self) -> u32 {
        let mut inner = self.inner.lock();
        inner.attempts += 1;
        inner.attempts
    }

    /// Run a surface command unless the instance has been disposed.
    ///
    /// The state lock is held for the duration of `op`, so disposal cannot
    /// slip in between the check and the platform call. Transient host
    /// failures come back as `PlaybackFailure`, everything else as
    /// `SurfaceUnavailable`.
    pub(crate) fn with_surface<T>(
        &self,
        op: impl FnOnce(&dyn MediaSurface) -> BridgeResult<T>,
    ) -> Result<T> {
        let inner = self.inner.lock();
        if inner.state == InstanceState::Disposed {
            return Err(PlaybackError::Disposed);
        }
        let result = op(self.surface.as_ref());
        drop(inner);
        result.map_err(|e| {
            if e.is_transient() {
                PlaybackError::PlaybackFailure(e.to_string())
            } else {
                PlaybackError::SurfaceUnavailable(e.to_string())
            }
        })
    }

    /// Record a natural end reported by the surface.
    ///
    /// Returns `true` when the instance is `Playing` and can be finished now.
    /// An end that races the play confirmation (state still `Ready`) is kept
    /// and picked up by [`take_pending_end`](Self::take_pending_end).
    pub(crate) fn record_end_signal(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            InstanceState::Playing => true,
            InstanceState::Ready => {
                inner.pending_end = true;
                false
            }
            _ => false,
        }
    }

    pub(crate) fn take_pending_end(&self) -> bool {
        std::mem::take(&mut self.inner.lock().pending_end)
    }

    /// Pause the surface if the instance is `Playing`. Returns whether it did.
    ///
    /// The state stays `Playing`: a paused instance is still live and is
    /// released by the reaper if nothing else ends it.
    pub fn pause(&self) -> bool {
        let inner = self.inner.lock();
        if inner.state != InstanceState::Playing || self.surface.is_paused() {
            return false;
        }
        match self.surface.pause() {
            Ok(()) => true,
            Err(e) => {
                debug!(instance_id = %self.id, error = %e, "Pause failed");
                false
            }
        }
    }

    /// Release the instance: cancel in-flight work, stop and detach the
    /// surface, move to `Disposed`. Returns `false` if it already was.
    pub(crate) fn dispose(&self, reason: DisposeReason) -> bool {
        let from = {
            let mut inner = self.inner.lock();
            if inner.state == InstanceState::Disposed {
                return false;
            }
            let from = inner.state;
            inner.state = InstanceState::Disposed;
            self.cancel.cancel();

            // Surface errors never block disposal.
            if let Err(e) = self.surface.pause() {
                trace!(instance_id = %self.id, error = %e, "Pause during dispose failed");
            }
            if let Err(e) = self.surface.rewind() {
                trace!(instance_id = %self.id, error = %e, "Rewind during dispose failed");
            }
            if let Err(e) = self.surface.detach() {
                debug!(instance_id = %self.id, error = %e, "Detach failed");
            }
            from
        };

        debug!(
            request_id = %self.request_id,
            instance_id = %self.id,
            kind = %self.kind,
            from = %from,
            reason = %reason,
            "Instance disposed"
        );
        self.emit_state_change(from, InstanceState::Disposed);
        self.events
            .emit(CoreEvent::Media(MediaEvent::Disposed {
                request_id: self.request_id.as_u64(),
                instance_id: self.id.as_u64(),
                kind: self.kind,
                reason,
            }))
            .ok();
        true
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    fn emit_state_change(&self, from: InstanceState, to: InstanceState) {
        self.events
            .emit(CoreEvent::Media(MediaEvent::StateChanged {
                request_id: self.request_id.as_u64(),
                instance_id: self.id.as_u64(),
                kind: self.kind,
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            }))
            .ok();
    }
}

impl fmt::Debug for MediaInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MediaInstance")
            .field("id", &self.id)
            .field("request_id", &self.request_id)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("state", &inner.state)
            .field("attempts", &inner.attempts)
            .finish()
    }
}

impl Drop for MediaInstance {
    fn drop(&mut self) {
        // Last owner gone without a dispose: never leave the surface attached.
        if self.inner.get_mut().state != InstanceState::Disposed {
            self.cancel.cancel();
            let _ = self.surface.detach();
        }
    }
}
