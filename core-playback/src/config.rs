//! # Playback Configuration
//!
//! Tunables of the feedback engine: readiness timeout, retry policy,
//! emergency lifetime, output volume, re-entrancy gating and media sources.
//! Every field has a serde default so hosts can ship a partial JSON object.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::attempt::RetryPolicy;
use crate::error::{PlaybackError, Result};

/// Feedback engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How long a media instance may take to report readiness.
    ///
    /// Default: 2000 ms.
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    /// Total load/play attempts per instance before giving up.
    ///
    /// Default: 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between attempts; the n-th retry waits `backoff_ms * n`.
    ///
    /// Default: 100 ms.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Lifetime after which the reaper force-disposes an instance that never
    /// signalled completion.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_emergency_lifetime_ms")]
    pub emergency_lifetime_ms: u64,

    /// Audio output gain in `0.0..=1.0`.
    ///
    /// Default: 0.7.
    #[serde(default = "default_audio_volume")]
    pub audio_volume: f32,

    /// Ignore interactions while a previous request is still being set up.
    ///
    /// Default: false.
    #[serde(default)]
    pub reentrancy_gate: bool,

    #[serde(default = "default_audio_source_uri")]
    pub audio_source_uri: String,

    #[serde(default = "default_visual_source_uri")]
    pub visual_source_uri: String,

    /// Display time of the visual clip. Animated images loop without an end
    /// signal, so the engine ends the visual this long after it started.
    ///
    /// Default: 1000 ms.
    #[serde(default = "default_visual_clip_ms")]
    pub visual_clip_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: default_readiness_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            emergency_lifetime_ms: default_emergency_lifetime_ms(),
            audio_volume: default_audio_volume(),
            reentrancy_gate: false,
            audio_source_uri: default_audio_source_uri(),
            visual_source_uri: default_visual_source_uri(),
            visual_clip_ms: default_visual_clip_ms(),
        }
    }
}

impl PlaybackConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::Config(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.readiness_timeout_ms == 0 {
            return Err(PlaybackError::Config(
                "readiness_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(PlaybackError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }

        if self.emergency_lifetime_ms == 0 {
            return Err(PlaybackError::Config(
                "emergency_lifetime_ms must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.audio_volume) {
            return Err(PlaybackError::Config(
                "audio_volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.audio_source_uri.trim().is_empty() || self.visual_source_uri.trim().is_empty() {
            return Err(PlaybackError::Config(
                "media source URIs cannot be empty".to_string(),
            ));
        }

        if self.visual_clip_ms == 0 {
            return Err(PlaybackError::Config(
                "visual_clip_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn emergency_lifetime(&self) -> Duration {
        Duration::from_millis(self.emergency_lifetime_ms)
    }

    pub fn visual_clip(&self) -> Duration {
        Duration::from_millis(self.visual_clip_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.backoff_ms))
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_readiness_timeout_ms() -> u64 {
    2000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    100
}

fn default_emergency_lifetime_ms() -> u64 {
    10_000
}

fn default_audio_volume() -> f32 {
    0.7
}

fn default_audio_source_uri() -> String {
    "assets/lizard.m4a".to_string()
}

fn default_visual_source_uri() -> String {
    "assets/lizard.gif".to_string()
}

fn default_visual_clip_ms() -> u64 {
    1000
}
