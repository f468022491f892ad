//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the feedback engine:
//! - Logging and tracing infrastructure
//! - Configuration management (bridges, capability profile, feature flags)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback engine depends on.
//! It establishes the logging conventions and the event broadcasting
//! mechanism used to observe request and instance lifecycles.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
