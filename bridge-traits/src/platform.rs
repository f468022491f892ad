//! Helper bounds shared by every bridge trait.
//!
//! Host adapters are shared across async tasks behind `Arc`, so every bridge
//! trait inherits `Send + Sync` through [`PlatformSendSync`]. Streams that are
//! only ever driven by a single task use the weaker [`PlatformSend`].

/// Marker trait for adapters shared between tasks.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync + ?Sized {}

/// Marker trait for values moved into a single task.
pub trait PlatformSend: Send {}

impl<T> PlatformSend for T where T: Send + ?Sized {}
