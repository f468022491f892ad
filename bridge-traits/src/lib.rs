//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement for the feedback
//! engine.
//!
//! ## Overview
//!
//! This crate defines the contract between the engine and platform-specific
//! implementations. The engine decides *when* media is created, played, paused
//! and released; the host decides *how* (DOM elements, native players, a
//! simulated backend in tests).
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaHost`](media::MediaHost) - Acquires media surfaces
//! - [`MediaSurface`](media::MediaSurface) - One playable element with load/play/pause/detach
//!
//! ### Platform Integration
//! - [`CapabilityProvider`](capability::CapabilityProvider) - Static platform facts ([`CapabilityProfile`])
//! - [`HostLifecycle`](lifecycle::HostLifecycle) - Visibility changes and teardown
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop / headless | `bridge-desktop` | ✅ Simulated surfaces |
//! | Web      | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Play refusals are
//! reported separately as [`PlayRejection`](media::PlayRejection) because the
//! engine treats an autoplay-policy refusal as expected behaviour rather than
//! a fault.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! async tasks behind `Arc`.

pub mod capability;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod media;
pub mod platform;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use capability::{CapabilityProfile, CapabilityProvider, PreloadHint};
pub use lifecycle::{HostLifecycle, HostSignal, HostSignalStream};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{
    MediaHost, MediaKind, MediaSurface, PlayRejection, SignalReceiver, SurfaceId, SurfaceSignal,
    SurfaceSpec, SIGNAL_CHANNEL_CAPACITY,
};
pub use time::{Clock, FixedClock, SystemClock};
