//! Host lifecycle signals.
//!
//! Hosts push two kinds of lifecycle information into the engine: visibility
//! changes (page hidden, app backgrounded) and a single best-effort teardown
//! notification at process/page end.
//!
//! - **Web**: Page Visibility API and `beforeunload`
//! - **Mobile**: application background/foreground callbacks
//! - **Desktop**: window minimize/restore and shutdown hooks

use async_trait::async_trait;

use crate::{
    error::Result,
    platform::{PlatformSend, PlatformSendSync},
};

/// A lifecycle notification pushed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// The host context became hidden (`true`) or visible again (`false`).
    Visibility { hidden: bool },
    /// The host is going away. Delivered at most once.
    Teardown,
}

/// Lifecycle observer trait.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::lifecycle::{HostLifecycle, HostSignal};
///
/// async fn follow(host: &dyn HostLifecycle) -> Result<()> {
///     let mut stream = host.subscribe().await?;
///     while let Some(signal) = stream.next().await {
///         if signal == HostSignal::Teardown {
///             break;
///         }
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait HostLifecycle: PlatformSendSync {
    /// Current visibility of the host context.
    fn is_hidden(&self) -> bool;

    /// Subscribe to lifecycle signals.
    async fn subscribe(&self) -> Result<Box<dyn HostSignalStream>>;
}

/// Stream of host lifecycle signals.
#[async_trait]
pub trait HostSignalStream: PlatformSend {
    /// Next signal, or `None` once the host closed the stream.
    async fn next(&mut self) -> Option<HostSignal>;
}
