//! Host Lifecycle Implementations

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    lifecycle::{HostLifecycle, HostSignal, HostSignalStream},
};
use core_async::sync::broadcast;
use tracing::{debug, warn};

const LIFECYCLE_CHANNEL_CAPACITY: usize = 32;

/// Desktop lifecycle observer: always visible, never emits.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopHostLifecycle;

impl DesktopHostLifecycle {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostLifecycle for DesktopHostLifecycle {
    fn is_hidden(&self) -> bool {
        false
    }

    async fn subscribe(&self) -> Result<Box<dyn HostSignalStream>> {
        Ok(Box::new(SilentSignalStream))
    }
}

struct SilentSignalStream;

#[async_trait]
impl HostSignalStream for SilentSignalStream {
    async fn next(&mut self) -> Option<HostSignal> {
        std::future::pending::<()>().await;
        None
    }
}

/// Lifecycle whose signals are pushed programmatically.
///
/// Window-system glue (minimize/restore hooks, shutdown handlers) calls
/// [`set_hidden`](Self::set_hidden) and [`teardown`](Self::teardown); every
/// subscriber observes the same sequence.
pub struct ChannelHostLifecycle {
    hidden: AtomicBool,
    torn_down: AtomicBool,
    sender: broadcast::Sender<HostSignal>,
}

impl ChannelHostLifecycle {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);
        Self {
            hidden: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            sender,
        }
    }

    /// Record a visibility change. Repeating the current state is a no-op.
    pub fn set_hidden(&self, hidden: bool) {
        if self.hidden.swap(hidden, Ordering::SeqCst) == hidden {
            return;
        }
        debug!(hidden, "Host visibility changed");
        let _ = self.sender.send(HostSignal::Visibility { hidden });
    }

    /// Announce teardown. Only the first call is delivered.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Host teardown announced");
        let _ = self.sender.send(HostSignal::Teardown);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelHostLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostLifecycle for ChannelHostLifecycle {
    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    async fn subscribe(&self) -> Result<Box<dyn HostSignalStream>> {
        Ok(Box::new(ChannelSignalStream {
            receiver: self.sender.subscribe(),
        }))
    }
}

struct ChannelSignalStream {
    receiver: broadcast::Receiver<HostSignal>,
}

#[async_trait]
impl HostSignalStream for ChannelSignalStream {
    async fn next(&mut self) -> Option<HostSignal> {
        loop {
            match self.receiver.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Lifecycle subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
