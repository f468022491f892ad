//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and headless hosts
//! (macOS, Windows, Linux, CI).
//!
//! ## Overview
//!
//! This crate provides implementations of the bridge traits that do not need
//! a rendering surface:
//! - `MediaHost` as a scripted, inspectable simulation ([`SimulatedMediaHost`])
//! - `HostLifecycle` as always-visible ([`DesktopHostLifecycle`]) or
//!   programmatically driven ([`ChannelHostLifecycle`])
//! - `CapabilityProvider` reading environment overrides
//!   ([`DesktopCapabilityProvider`])
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ChannelHostLifecycle, SimulatedMediaHost};
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_host(Arc::new(SimulatedMediaHost::new()))
//!     .host_lifecycle(Arc::new(ChannelHostLifecycle::new()))
//!     .build()?;
//! ```

mod capability;
mod host;
mod lifecycle;
mod surface;

pub use capability::{
    detect_capabilities, DesktopCapabilityProvider, RESTRICTED_AUTOPLAY_ENV, TOUCH_CAPABLE_ENV,
};
pub use host::SimulatedMediaHost;
pub use lifecycle::{ChannelHostLifecycle, DesktopHostLifecycle};
pub use surface::{PlayOutcome, SimulatedSurface, SurfaceScript};
