//! Desktop capability detection.
//!
//! Desktop hosts are mouse driven and have no autoplay restriction. Both
//! facts can be overridden through environment variables so headless runs can
//! rehearse the touch/restricted code paths:
//!
//! - `FEEDBACK_TOUCH_CAPABLE`
//! - `FEEDBACK_RESTRICTED_AUTOPLAY`
//!
//! Accepted truthy values are `1`, `true`, `yes` and `on` (case-insensitive).

use bridge_traits::{CapabilityProfile, CapabilityProvider};
use tracing::debug;

pub const TOUCH_CAPABLE_ENV: &str = "FEEDBACK_TOUCH_CAPABLE";
pub const RESTRICTED_AUTOPLAY_ENV: &str = "FEEDBACK_RESTRICTED_AUTOPLAY";

/// Capability provider for desktop processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopCapabilityProvider;

impl DesktopCapabilityProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityProvider for DesktopCapabilityProvider {
    fn profile(&self) -> CapabilityProfile {
        detect_capabilities()
    }
}

/// Computes the profile from the process environment.
pub fn detect_capabilities() -> CapabilityProfile {
    profile_from(|key| std::env::var(key).ok())
}

fn profile_from<F>(lookup: F) -> CapabilityProfile
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = CapabilityProfile::desktop();
    let flag = |key: &str, default: bool| lookup(key).map(|v| parse_flag(&v)).unwrap_or(default);

    let profile = CapabilityProfile::new(
        flag(TOUCH_CAPABLE_ENV, defaults.is_touch_capable),
        flag(
            RESTRICTED_AUTOPLAY_ENV,
            defaults.has_restricted_autoplay_policy,
        ),
    );
    debug!(?profile, "Detected capability profile");
    profile
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_desktop() {
        assert_eq!(profile_from(lookup(&[])), CapabilityProfile::desktop());
    }

    #[test]
    fn test_env_overrides() {
        let profile = profile_from(lookup(&[
            (TOUCH_CAPABLE_ENV, "TRUE"),
            (RESTRICTED_AUTOPLAY_ENV, "1"),
        ]));
        assert_eq!(profile, CapabilityProfile::restricted_touch());
    }

    #[test]
    fn test_unrecognised_values_are_false() {
        let profile = profile_from(lookup(&[(TOUCH_CAPABLE_ENV, "maybe")]));
        assert!(!profile.is_touch_capable);
    }
}
