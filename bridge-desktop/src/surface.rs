//! Simulated media surfaces.
//!
//! A [`SimulatedSurface`] behaves like a host media element driven by a
//! [`SurfaceScript`]: loading takes a configurable delay before `CanPlay` (or
//! an error), play commands resolve from a scripted queue of outcomes, and an
//! accepted play ends naturally after the scripted clip duration.
//!
//! Timers run on the ambient runtime, so tests with a paused clock drive the
//! whole surface deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    MediaKind, MediaSurface, PlayRejection, PreloadHint, SignalReceiver, SurfaceId,
    SurfaceSignal, SurfaceSpec, SIGNAL_CHANNEL_CAPACITY,
};
use core_async::sync::broadcast;
use core_async::time::{timeout, Duration};
use core_async::CancellationToken;
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Result of a scripted play command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Accept,
    PolicyDenied,
    Fail(String),
}

impl PlayOutcome {
    fn into_result(self) -> std::result::Result<(), PlayRejection> {
        match self {
            PlayOutcome::Accept => Ok(()),
            PlayOutcome::PolicyDenied => Err(PlayRejection::PolicyDenied),
            PlayOutcome::Fail(message) => Err(PlayRejection::Failed(message)),
        }
    }
}

/// Behaviour of surfaces created by a [`SimulatedMediaHost`](crate::SimulatedMediaHost).
#[derive(Debug, Clone)]
pub struct SurfaceScript {
    /// Delay between `load()` and `CanPlay`. `None` never becomes ready.
    pub ready_after: Option<Duration>,

    /// Number of initial loads that report an error instead of `CanPlay`.
    pub failing_loads: u32,

    /// Outcomes consumed by successive play commands, front first.
    pub play_outcomes: VecDeque<PlayOutcome>,

    /// Outcome once `play_outcomes` is exhausted.
    pub default_play: PlayOutcome,

    /// Time from an accepted play to `Ended`. `None` never ends.
    pub clip_duration: Option<Duration>,

    /// Make `create_surface` fail with this message.
    pub create_error: Option<String>,
}

impl SurfaceScript {
    /// Becomes ready after `ready_after`, accepts play, never ends.
    pub fn ready_after(ready_after: Duration) -> Self {
        Self {
            ready_after: Some(ready_after),
            ..Self::default()
        }
    }

    /// Never reaches `CanPlay`.
    pub fn never_ready() -> Self {
        Self {
            ready_after: None,
            ..Self::default()
        }
    }

    pub fn with_clip_duration(mut self, duration: Duration) -> Self {
        self.clip_duration = Some(duration);
        self
    }

    pub fn with_failing_loads(mut self, count: u32) -> Self {
        self.failing_loads = count;
        self
    }

    /// Queue an outcome for the next unscripted play command.
    pub fn then_play(mut self, outcome: PlayOutcome) -> Self {
        self.play_outcomes.push_back(outcome);
        self
    }

    pub fn with_default_play(mut self, outcome: PlayOutcome) -> Self {
        self.default_play = outcome;
        self
    }

    /// Every play command is refused by the autoplay policy.
    pub fn policy_denied(self) -> Self {
        self.with_default_play(PlayOutcome::PolicyDenied)
    }

    pub fn with_create_error(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }
}

impl Default for SurfaceScript {
    fn default() -> Self {
        Self {
            ready_after: Some(Duration::from_millis(20)),
            failing_loads: 0,
            play_outcomes: VecDeque::new(),
            default_play: PlayOutcome::Accept,
            clip_duration: None,
            create_error: None,
        }
    }
}

#[derive(Debug)]
struct PlaybackState {
    ready: bool,
    paused: bool,
    loads_issued: u32,
    play_outcomes: VecDeque<PlayOutcome>,
    /// Bumped on every load/play/pause so stale timers stay silent.
    generation: u64,
}

/// A scripted, in-memory [`MediaSurface`].
pub struct SimulatedSurface {
    id: SurfaceId,
    spec: SurfaceSpec,
    script: SurfaceScript,
    signals: broadcast::Sender<SurfaceSignal>,
    state: Arc<Mutex<PlaybackState>>,
    attached: AtomicBool,
    detached_token: CancellationToken,
    play_calls: AtomicUsize,
    rewinds: AtomicUsize,
    detach_calls: AtomicUsize,
    live_surfaces: Arc<AtomicU64>,
}

impl SimulatedSurface {
    pub(crate) fn new(
        spec: SurfaceSpec,
        script: SurfaceScript,
        live_surfaces: Arc<AtomicU64>,
    ) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        live_surfaces.fetch_add(1, Ordering::SeqCst);
        let play_outcomes = script.play_outcomes.clone();
        Self {
            id: SurfaceId::new(),
            spec,
            script,
            signals,
            state: Arc::new(Mutex::new(PlaybackState {
                ready: false,
                paused: true,
                loads_issued: 0,
                play_outcomes,
                generation: 0,
            })),
            attached: AtomicBool::new(true),
            detached_token: CancellationToken::new(),
            play_calls: AtomicUsize::new(0),
            rewinds: AtomicUsize::new(0),
            detach_calls: AtomicUsize::new(0),
            live_surfaces,
        }
    }

    pub fn spec(&self) -> &SurfaceSpec {
        &self.spec
    }

    pub fn preload(&self) -> PreloadHint {
        self.spec.preload
    }

    pub fn loads_issued(&self) -> u32 {
        self.state.lock().loads_issued
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn rewinds(&self) -> usize {
        self.rewinds.load(Ordering::SeqCst)
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    /// Live signal receivers.
    pub fn subscriber_count(&self) -> usize {
        self.signals.receiver_count()
    }

    /// Push a signal to subscribers as if the host element raised it.
    pub fn emit(&self, signal: SurfaceSignal) {
        if matches!(signal, SurfaceSignal::CanPlay) {
            self.state.lock().ready = true;
        }
        // No receivers is fine.
        let _ = self.signals.send(signal);
    }

    fn ensure_attached(&self) -> Result<()> {
        if self.attached.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BridgeError::Detached)
        }
    }

    /// Fire `signal` after `delay` unless the surface detaches or the
    /// generation moves on first.
    fn schedule(&self, delay: Duration, generation: u64, signal: SurfaceSignal) -> Result<()> {
        let handle = core_async::runtime::Handle::try_current().map_err(|_| {
            BridgeError::OperationFailed("simulated surface needs an async runtime".to_string())
        })?;

        let state = Arc::clone(&self.state);
        let sender = self.signals.clone();
        let token = self.detached_token.clone();

        handle.spawn(async move {
            // Cancellation winning the race means the surface was detached.
            if timeout(delay, token.cancelled()).await.is_ok() {
                return;
            }
            {
                let mut state = state.lock();
                if state.generation != generation {
                    return;
                }
                match &signal {
                    SurfaceSignal::CanPlay => state.ready = true,
                    SurfaceSignal::Ended => state.paused = true,
                    SurfaceSignal::Error { .. } => {}
                }
            }
            let _ = sender.send(signal);
        });
        Ok(())
    }
}

#[async_trait]
impl MediaSurface for SimulatedSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn kind(&self) -> MediaKind {
        self.spec.kind
    }

    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn subscribe(&self) -> SignalReceiver {
        self.signals.subscribe()
    }

    fn load(&self) -> Result<()> {
        self.ensure_attached()?;

        let (generation, failing) = {
            let mut state = self.state.lock();
            state.loads_issued += 1;
            state.ready = false;
            state.generation += 1;
            (
                state.generation,
                state.loads_issued <= self.script.failing_loads,
            )
        };

        trace!(surface = %self.id, kind = %self.spec.kind, failing, "load issued");

        let Some(delay) = self.script.ready_after else {
            return Ok(());
        };

        let signal = if failing {
            SurfaceSignal::Error {
                message: format!("simulated load failure for {}", self.spec.source_uri),
            }
        } else {
            SurfaceSignal::CanPlay
        };
        self.schedule(delay, generation, signal)
    }

    fn rewind(&self) -> Result<()> {
        self.ensure_attached()?;
        self.rewinds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&self) -> std::result::Result<(), PlayRejection> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        if !self.attached.load(Ordering::SeqCst) {
            return Err(PlayRejection::Failed("surface detached".to_string()));
        }

        let (outcome, generation) = {
            let mut state = self.state.lock();
            if !state.ready {
                return Err(PlayRejection::Failed("surface not ready".to_string()));
            }
            let outcome = state
                .play_outcomes
                .pop_front()
                .unwrap_or_else(|| self.script.default_play.clone());
            if outcome == PlayOutcome::Accept {
                state.paused = false;
                state.generation += 1;
            }
            (outcome, state.generation)
        };

        debug!(surface = %self.id, kind = %self.spec.kind, ?outcome, "play command");

        if outcome == PlayOutcome::Accept {
            if let Some(clip) = self.script.clip_duration {
                self.schedule(clip, generation, SurfaceSignal::Ended)
                    .map_err(|e| PlayRejection::Failed(e.to_string()))?;
            }
        }

        outcome.into_result()
    }

    fn pause(&self) -> Result<()> {
        self.ensure_attached()?;
        let mut state = self.state.lock();
        state.paused = true;
        state.generation += 1;
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn detach(&self) -> Result<()> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        if self.attached.swap(false, Ordering::SeqCst) {
            self.detached_token.cancel();
            self.state.lock().paused = true;
            self.live_surfaces.fetch_sub(1, Ordering::SeqCst);
            trace!(surface = %self.id, kind = %self.spec.kind, "detached");
        }
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedSurface {
    fn drop(&mut self) {
        if self.attached.swap(false, Ordering::SeqCst) {
            self.detached_token.cancel();
            self.live_surfaces.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
