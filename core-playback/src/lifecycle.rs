//! # Resource Lifecycle Manager
//!
//! Tracks every live [`MediaInstance`] and guarantees its release.
//!
//! ## Overview
//!
//! Registering an instance inserts a weak reference into the live registry
//! and spawns a watcher task for it. The watcher disposes the instance on the
//! first of:
//!
//! 1. the surface's `Ended` signal while playing (an end reported while the
//!    play command is still being confirmed is applied right after it)
//! 2. the surface's `Error` signal while playing
//! 3. the emergency deadline (`created_at + max_lifetime`)
//!
//! Disposal through any path cancels the instance token, which also stops the
//! watcher and with it the emergency timer. Errors during loading are not the
//! watcher's business: the playback attempt retries them and the request
//! disposes the instance once the attempt gives up.
//!
//! ## Ownership
//!
//! The registry never keeps an instance alive. If the owning request drops
//! it, the instance detaches its surface on drop and the watcher removes the
//! stale entry.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use bridge_traits::{MediaKind, SignalReceiver, SurfaceSignal};
use core_async::sync::broadcast::error::RecvError;
use core_async::sync::watch;
use core_async::time::{sleep_until, Duration};
use core_async::CancellationToken;
use core_runtime::events::{CoreEvent, DisposeReason, EventBus, MediaEvent};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::instance::{InstanceId, InstanceState, MediaInstance};
use crate::request::RequestId;

struct Entry {
    instance: Weak<MediaInstance>,
    request_id: RequestId,
    kind: MediaKind,
}

struct Registry {
    entries: Mutex<HashMap<InstanceId, Entry>>,
    live: watch::Sender<usize>,
    events: EventBus,
}

impl Registry {
    fn remove(&self, id: InstanceId) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.remove(&id).is_some();
        if removed {
            self.live.send_replace(entries.len());
        }
        removed
    }
}

/// Live registry of media instances with guaranteed disposal.
///
/// Cloning is cheap; clones share the registry.
#[derive(Clone)]
pub struct ResourceLifecycleManager {
    registry: Arc<Registry>,
}

impl ResourceLifecycleManager {
    pub fn new(events: EventBus) -> Self {
        let (live, _) = watch::channel(0);
        Self {
            registry: Arc::new(Registry {
                entries: Mutex::new(HashMap::new()),
                live,
                events,
            }),
        }
    }

    /// Add `instance` to the live registry and arm its emergency timer.
    ///
    /// Registering a disposed or already registered instance does nothing.
    pub fn register(&self, instance: &Arc<MediaInstance>, max_lifetime: Duration) {
        if instance.is_disposed() {
            debug!(instance_id = %instance.id(), "Not registering disposed instance");
            return;
        }

        {
            let mut entries = self.registry.entries.lock();
            if entries.contains_key(&instance.id()) {
                return;
            }
            entries.insert(
                instance.id(),
                Entry {
                    instance: Arc::downgrade(instance),
                    request_id: instance.request_id(),
                    kind: instance.kind(),
                },
            );
            self.registry.live.send_replace(entries.len());
        }

        // Subscribe now so no completion signal can slip past the watcher.
        let signals = instance.surface().subscribe();
        let watcher = Watcher {
            id: instance.id(),
            instance: Arc::downgrade(instance),
            token: instance.cancellation().clone(),
            deadline: instance.created_at() + max_lifetime,
            max_lifetime,
            manager: self.clone(),
        };
        core_async::spawn(watcher.run(signals));

        trace!(
            request_id = %instance.request_id(),
            instance_id = %instance.id(),
            kind = %instance.kind(),
            lifetime_ms = max_lifetime.as_millis() as u64,
            "Instance registered"
        );
    }

    /// Dispose `instance` and remove it from the registry.
    ///
    /// Idempotent. Unregistered or already disposed instances are left alone.
    /// Returns whether this call released the instance.
    pub fn dispose(&self, instance: &MediaInstance) -> bool {
        self.dispose_with(instance, DisposeReason::Explicit)
    }

    /// Finish `instance` with a terminal state matching `reason`, then
    /// dispose it.
    pub(crate) fn complete(&self, instance: &MediaInstance, reason: DisposeReason) -> bool {
        let terminal = match reason {
            DisposeReason::Ended => Some(InstanceState::Ended),
            DisposeReason::Errored => Some(InstanceState::Errored),
            _ => None,
        };
        if let Some(terminal) = terminal {
            let state = instance.state();
            if state != terminal && state.can_transition_to(terminal) {
                // Losing a race with disposal is fine here.
                let _ = instance.transition(terminal);
            }
        }
        self.dispose_with(instance, reason)
    }

    pub(crate) fn dispose_with(&self, instance: &MediaInstance, reason: DisposeReason) -> bool {
        if !self.is_live(instance.id()) {
            trace!(instance_id = %instance.id(), "Dispose of unregistered instance ignored");
            return false;
        }
        let released = instance.dispose(reason);
        self.registry.remove(instance.id());
        released
    }

    /// Called once an attempt left `instance` playing. Finishes it right away
    /// if its surface already reported the end while play was confirming.
    pub(crate) fn playback_started(&self, instance: &MediaInstance) -> bool {
        if !instance.take_pending_end() {
            return false;
        }
        debug!(
            request_id = %instance.request_id(),
            instance_id = %instance.id(),
            kind = %instance.kind(),
            "Clip ended before play was confirmed"
        );
        self.complete(instance, DisposeReason::Ended)
    }

    /// Dispose every live instance. Returns how many were released.
    pub fn dispose_all(&self, reason: DisposeReason) -> usize {
        let snapshot: Vec<(InstanceId, Weak<MediaInstance>)> = self
            .registry
            .entries
            .lock()
            .iter()
            .map(|(id, entry)| (*id, entry.instance.clone()))
            .collect();

        let mut released = 0;
        for (id, weak) in snapshot {
            match weak.upgrade() {
                Some(instance) => {
                    if self.dispose_with(&instance, reason) {
                        released += 1;
                    }
                }
                None => {
                    self.registry.remove(id);
                }
            }
        }
        released
    }

    pub fn live_count(&self) -> usize {
        self.registry.entries.lock().len()
    }

    pub fn is_live(&self, id: InstanceId) -> bool {
        self.registry.entries.lock().contains_key(&id)
    }

    /// Strong handles to every live instance still owned by a request.
    pub fn live_instances(&self) -> Vec<Arc<MediaInstance>> {
        self.registry
            .entries
            .lock()
            .values()
            .filter_map(|entry| entry.instance.upgrade())
            .collect()
    }

    /// Live instances grouped by request, for diagnostics.
    pub fn live_by_request(&self) -> HashMap<RequestId, Vec<(InstanceId, MediaKind)>> {
        let mut grouped: HashMap<RequestId, Vec<(InstanceId, MediaKind)>> = HashMap::new();
        for (id, entry) in self.registry.entries.lock().iter() {
            grouped
                .entry(entry.request_id)
                .or_default()
                .push((*id, entry.kind));
        }
        grouped
    }

    /// Resolve once the registry is empty.
    pub async fn wait_until_idle(&self) {
        let mut live = self.registry.live.subscribe();
        // The sender lives inside `self`, so the channel cannot close here.
        let _ = live.wait_for(|count| *count == 0).await;
    }
}

/// Per-instance task translating surface signals and the emergency deadline
/// into disposal.
struct Watcher {
    id: InstanceId,
    instance: Weak<MediaInstance>,
    token: CancellationToken,
    deadline: core_async::Instant,
    max_lifetime: Duration,
    manager: ResourceLifecycleManager,
}

impl Watcher {
    async fn run(self, mut signals: SignalReceiver) {
        let mut signals_open = true;

        loop {
            core_async::select! {
                biased;
                _ = self.token.cancelled() => {
                    // Disposed elsewhere, or dropped by its owner.
                    self.manager.registry.remove(self.id);
                    return;
                }
                _ = sleep_until(self.deadline) => {
                    self.reap();
                    return;
                }
                signal = signals.recv(), if signals_open => match signal {
                    Ok(SurfaceSignal::Ended) => {
                        if self.finish(DisposeReason::Ended) {
                            return;
                        }
                    }
                    Ok(SurfaceSignal::Error { message }) => {
                        if self.finish_with_error(&message) {
                            return;
                        }
                    }
                    Ok(SurfaceSignal::CanPlay) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => signals_open = false,
                },
            }
        }
    }

    fn upgrade(&self) -> Option<Arc<MediaInstance>> {
        let instance = self.instance.upgrade();
        if instance.is_none() {
            self.manager.registry.remove(self.id);
        }
        instance
    }

    /// Natural end. Only meaningful once the instance plays; an end that
    /// beats the `Playing` transition is parked on the instance.
    fn finish(&self, reason: DisposeReason) -> bool {
        let Some(instance) = self.upgrade() else {
            return true;
        };
        if !instance.record_end_signal() {
            return false;
        }
        self.manager.complete(&instance, reason);
        true
    }

    fn finish_with_error(&self, message: &str) -> bool {
        let Some(instance) = self.upgrade() else {
            return true;
        };
        if instance.state() != InstanceState::Playing {
            // Loading errors belong to the playback attempt.
            return false;
        }
        warn!(
            request_id = %instance.request_id(),
            instance_id = %instance.id(),
            kind = %instance.kind(),
            error = message,
            "Media failed during playback"
        );
        self.manager.complete(&instance, DisposeReason::Errored);
        true
    }

    fn reap(&self) {
        let Some(instance) = self.upgrade() else {
            return;
        };
        if instance.is_disposed() {
            self.manager.registry.remove(self.id);
            return;
        }

        warn!(
            request_id = %instance.request_id(),
            instance_id = %instance.id(),
            kind = %instance.kind(),
            state = %instance.state(),
            lifetime_ms = self.max_lifetime.as_millis() as u64,
            "Emergency reaper disposing instance"
        );
        self.manager
            .registry
            .events
            .emit(CoreEvent::Media(MediaEvent::EmergencyReaped {
                request_id: instance.request_id().as_u64(),
                instance_id: instance.id().as_u64(),
                kind: instance.kind(),
                lifetime_ms: self.max_lifetime.as_millis() as u64,
            }))
            .ok();
        self.manager
            .dispose_with(&instance, DisposeReason::EmergencyTimeout);
    }
}
