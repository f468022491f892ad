//! Platform capability facts.
//!
//! The engine never sniffs user agents or touch APIs itself. The host computes
//! a [`CapabilityProfile`] once at start-up and injects it; everything the
//! engine decides about autoplay handling is derived from these two booleans.

use serde::{Deserialize, Serialize};

use crate::platform::PlatformSendSync;

/// How eagerly a host should fetch media data for a freshly created surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreloadHint {
    /// Let the host buffer on its own schedule.
    Auto,
    /// Kick off loading explicitly as soon as the surface exists. Restricted
    /// platforms tend to ignore passive preload attributes.
    Explicit,
}

/// Static platform facts, computed once and shared read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityProfile {
    /// The device delivers touch events (tap feedback arrives as touch input).
    pub is_touch_capable: bool,
    /// The platform blocks programmatic audio until a qualifying user gesture.
    pub has_restricted_autoplay_policy: bool,
}

impl CapabilityProfile {
    pub const fn new(is_touch_capable: bool, has_restricted_autoplay_policy: bool) -> Self {
        Self {
            is_touch_capable,
            has_restricted_autoplay_policy,
        }
    }

    /// Mouse-driven desktop browser or native desktop host.
    pub const fn desktop() -> Self {
        Self::new(false, false)
    }

    /// Touch device with a strict gesture requirement for audio (mobile Safari class).
    pub const fn restricted_touch() -> Self {
        Self::new(true, true)
    }

    /// Touch device with a permissive autoplay policy.
    pub const fn permissive_touch() -> Self {
        Self::new(true, false)
    }

    /// Whether audio may only be attempted after a user gesture was observed.
    pub fn requires_gesture_for_audio(&self) -> bool {
        self.has_restricted_autoplay_policy
    }

    /// Whether the first touch should be used to unlock the audio path before
    /// the tap that actually triggers feedback completes.
    pub fn should_prime_audio_on_touch(&self) -> bool {
        self.is_touch_capable && self.has_restricted_autoplay_policy
    }

    /// Preload behaviour surfaces should be created with on this platform.
    pub fn preload_hint(&self) -> PreloadHint {
        if self.has_restricted_autoplay_policy {
            PreloadHint::Explicit
        } else {
            PreloadHint::Auto
        }
    }
}

/// Source of the capability profile.
///
/// Hosts that detect capabilities lazily implement this; a plain
/// [`CapabilityProfile`] is its own provider.
pub trait CapabilityProvider: PlatformSendSync {
    fn profile(&self) -> CapabilityProfile;
}

impl CapabilityProvider for CapabilityProfile {
    fn profile(&self) -> CapabilityProfile {
        *self
    }
}
