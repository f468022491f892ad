//! # Core Configuration Module
//!
//! Provides the host wiring for the feedback engine.
//!
//! ## Overview
//!
//! A builder assembles a [`CoreConfig`] holding the bridge implementations the
//! engine talks to plus feature flags. The builder validates eagerly so a
//! missing bridge is reported at start-up with an actionable message instead
//! of surfacing as a silent no-op on the first tap.
//!
//! Tunables of the playback engine itself (timeouts, retry policy, volumes,
//! sources) live in `core_playback::PlaybackConfig`.
//!
//! ## Required Dependencies
//!
//! - `MediaHost` - creates the audio/visual surfaces
//!
//! ## Optional Dependencies
//!
//! - `CapabilityProvider` - platform facts (defaults to a desktop profile)
//! - `HostLifecycle` - visibility/teardown signals (required when
//!   `follow_host_lifecycle` is enabled)
//! - `Clock` - wall-clock source (defaults to [`SystemClock`])
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_host(Arc::new(MyMediaHost::new()))
//!     .capabilities(CapabilityProfile::restricted_touch())
//!     .build()?;
//! ```
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Fails fast: no media host was provided.
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing media host");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    CapabilityProfile, CapabilityProvider, Clock, HostLifecycle, MediaHost, SystemClock,
};
use std::sync::Arc;

/// Upper bound accepted for the event bus buffer.
pub const MAX_EVENT_BUFFER_SIZE: usize = 4096;

/// Host wiring for the feedback engine.
#[derive(Clone)]
pub struct CoreConfig {
    /// Creates media surfaces (required)
    pub media_host: Arc<dyn MediaHost>,

    /// Static platform facts, resolved once at build time
    pub capabilities: CapabilityProfile,

    /// Visibility/teardown signal source (optional)
    pub host_lifecycle: Option<Arc<dyn HostLifecycle>>,

    /// Wall-clock source for interaction timestamps
    pub clock: Arc<dyn Clock>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_host", &"MediaHost { ... }")
            .field("capabilities", &self.capabilities)
            .field(
                "host_lifecycle",
                &self
                    .host_lifecycle
                    .as_ref()
                    .map(|_| "HostLifecycle { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// On touch devices with a restricted autoplay policy, ask the host to
    /// unlock audio on the first touch.
    pub prime_audio_on_touch: bool,

    /// Pause playing instances when the host becomes hidden.
    pub pause_on_hidden: bool,

    /// Subscribe to the `HostLifecycle` bridge automatically (requires one).
    pub follow_host_lifecycle: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            prime_audio_on_touch: true,
            pause_on_hidden: true,
            follow_host_lifecycle: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.follow_host_lifecycle && self.host_lifecycle.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "HostLifecycle".to_string(),
                message: "follow_host_lifecycle is enabled but no HostLifecycle bridge was \
                          provided. Inject one via CoreConfigBuilder::host_lifecycle or \
                          disable the feature."
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn media_host_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaHost".to_string(),
        message: "No MediaHost implementation provided. \
                  Desktop/headless: use bridge_desktop::SimulatedMediaHost. \
                  Web/mobile: inject the platform media adapter."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_host: Option<Arc<dyn MediaHost>>,
    capabilities: Option<Arc<dyn CapabilityProvider>>,
    host_lifecycle: Option<Arc<dyn HostLifecycle>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn media_host(mut self, host: Arc<dyn MediaHost>) -> Self {
        self.media_host = Some(host);
        self
    }

    /// Sets a fixed capability profile.
    pub fn capabilities(mut self, profile: CapabilityProfile) -> Self {
        self.capabilities = Some(Arc::new(profile));
        self
    }

    /// Sets a provider queried once when the config is built.
    pub fn capability_provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.capabilities = Some(provider);
        self
    }

    pub fn host_lifecycle(mut self, lifecycle: Arc<dyn HostLifecycle>) -> Self {
        self.host_lifecycle = Some(lifecycle);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn prime_audio_on_touch(mut self, enabled: bool) -> Self {
        self.features.prime_audio_on_touch = enabled;
        self
    }

    pub fn pause_on_hidden(mut self, enabled: bool) -> Self {
        self.features.pause_on_hidden = enabled;
        self
    }

    pub fn follow_host_lifecycle(mut self, enabled: bool) -> Self {
        self.features.follow_host_lifecycle = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `MediaHost` was provided, or
    ///   when `follow_host_lifecycle` is on without a `HostLifecycle`
    /// - [`Error::Config`] for out-of-range values
    pub fn build(self) -> Result<CoreConfig> {
        let media_host = self.media_host.ok_or_else(media_host_missing_error)?;

        let capabilities = self
            .capabilities
            .map(|provider| provider.profile())
            .unwrap_or_else(CapabilityProfile::desktop);

        let config = CoreConfig {
            media_host,
            capabilities,
            host_lifecycle: self.host_lifecycle,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}
