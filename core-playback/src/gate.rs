//! Interaction and re-entrancy gates.
//!
//! [`InteractionGate`] encodes the autoplay rule: audio is never attempted
//! before the first user-originated event. [`ReentrancyGate`] optionally drops
//! interactions while a previous request is still being set up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Write-once "has the user interacted yet" flag.
#[derive(Debug, Default)]
pub struct InteractionGate {
    has_interacted: AtomicBool,
}

impl InteractionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user-originated event. Returns `true` for the first one.
    pub fn mark_interacted(&self) -> bool {
        !self.has_interacted.swap(true, Ordering::AcqRel)
    }

    pub fn can_attempt_audio(&self) -> bool {
        self.has_interacted.load(Ordering::Acquire)
    }

    /// Forget every interaction. Only teardown calls this.
    pub fn reset(&self) {
        self.has_interacted.store(false, Ordering::Release);
    }
}

/// Admits one request setup at a time when enabled.
#[derive(Debug, Clone)]
pub struct ReentrancyGate {
    enabled: bool,
    busy: Arc<AtomicBool>,
}

impl ReentrancyGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the gate. `None` means a previous request still holds it.
    ///
    /// A disabled gate always admits and its permits release nothing.
    pub fn try_enter(&self) -> Option<ReentrancyPermit> {
        if !self.enabled {
            return Some(ReentrancyPermit { busy: None });
        }

        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReentrancyPermit {
                busy: Some(Arc::clone(&self.busy)),
            })
    }
}

/// Releases the [`ReentrancyGate`] when dropped.
#[derive(Debug)]
pub struct ReentrancyPermit {
    busy: Option<Arc<AtomicBool>>,
}

impl Drop for ReentrancyPermit {
    fn drop(&mut self) {
        if let Some(busy) = self.busy.take() {
            busy.store(false, Ordering::Release);
        }
    }
}
