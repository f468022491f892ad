//! Media surface bridge traits.
//!
//! A [`MediaSurface`] is the host's handle on one playable element (an audio
//! element, an animated image, a native player voice). The engine creates one
//! per media instance through [`MediaHost::create_surface`], drives it through
//! load → play, and finally detaches it. Everything platform specific (element
//! construction, styling, decoding) stays on the host side of this boundary.
//!
//! Surfaces report asynchronous progress through a broadcast channel of
//! [`SurfaceSignal`]s. Each consumer holds its own receiver; dropping the
//! receiver is the unsubscribe.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{capability::PreloadHint, error::Result, platform::PlatformSendSync};

/// Buffer size hosts should use for a surface's signal channel.
pub const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Kind of media a surface renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Visual,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Visual => "visual",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-side identifier of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a host needs to build a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSpec {
    pub kind: MediaKind,
    /// Opaque source reference, passed through from configuration.
    pub source_uri: String,
    /// Output gain in `0.0..=1.0`. Ignored by visual surfaces.
    pub volume: f32,
    pub preload: PreloadHint,
}

impl SurfaceSpec {
    pub fn new(kind: MediaKind, source_uri: impl Into<String>) -> Self {
        Self {
            kind,
            source_uri: source_uri.into(),
            volume: 1.0,
            preload: PreloadHint::Auto,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_preload(mut self, preload: PreloadHint) -> Self {
        self.preload = preload;
        self
    }
}

/// Asynchronous notifications emitted by a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSignal {
    /// Enough data is buffered to start playback immediately.
    CanPlay,
    /// Playback reached its natural end.
    Ended,
    /// Loading or decoding failed.
    Error { message: String },
}

/// Why a host refused a play command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayRejection {
    /// The platform's autoplay policy blocked playback absent a user gesture.
    #[error("playback blocked by autoplay policy")]
    PolicyDenied,

    /// Any other refusal (unsupported source, device busy, ...).
    #[error("playback rejected: {0}")]
    Failed(String),
}

/// Receiving half of a surface's signal channel.
pub type SignalReceiver = broadcast::Receiver<SurfaceSignal>;

/// One playable element owned by the host.
#[async_trait]
pub trait MediaSurface: PlatformSendSync {
    fn id(&self) -> SurfaceId;

    fn kind(&self) -> MediaKind;

    /// Whether the surface can start playing right now without buffering.
    fn is_ready(&self) -> bool;

    /// Subscribe to future signals. Signals emitted before the call are not
    /// replayed; callers check [`MediaSurface::is_ready`] after subscribing.
    fn subscribe(&self) -> SignalReceiver;

    /// Start (or restart) fetching media data.
    fn load(&self) -> Result<()>;

    /// Reset the playback position to the start of the clip.
    fn rewind(&self) -> Result<()>;

    /// Issue the play command. Resolves once the host accepted or refused it.
    async fn play(&self) -> std::result::Result<(), PlayRejection>;

    fn pause(&self) -> Result<()>;

    fn is_paused(&self) -> bool;

    /// Remove the surface from whatever renders it. Detaching twice is allowed.
    fn detach(&self) -> Result<()>;

    fn is_attached(&self) -> bool;
}

/// Factory for media surfaces.
#[async_trait]
pub trait MediaHost: PlatformSendSync {
    /// Acquire a new surface. The returned surface starts attached.
    fn create_surface(&self, spec: SurfaceSpec) -> Result<Arc<dyn MediaSurface>>;

    /// Best-effort unlock of the audio output path from within a user gesture
    /// (for example by playing a silent clip). Hosts without such a concept
    /// keep the default.
    async fn prime_audio(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_spec_clamps_volume() {
        let spec = SurfaceSpec::new(MediaKind::Audio, "clip.m4a").with_volume(1.7);
        assert_eq!(spec.volume, 1.0);
        let spec = spec.with_volume(-0.2);
        assert_eq!(spec.volume, 0.0);
    }

    #[test]
    fn surface_spec_defaults() {
        let spec = SurfaceSpec::new(MediaKind::Visual, "clip.gif");
        assert_eq!(spec.kind, MediaKind::Visual);
        assert_eq!(spec.source_uri, "clip.gif");
        assert_eq!(spec.preload, PreloadHint::Auto);
    }

    #[test]
    fn surface_ids_are_unique() {
        assert_ne!(SurfaceId::new(), SurfaceId::new());
    }

    #[test]
    fn media_kind_display() {
        assert_eq!(MediaKind::Audio.to_string(), "audio");
        assert_eq!(MediaKind::Visual.to_string(), "visual");
    }

    #[test]
    fn play_rejection_messages() {
        assert_eq!(
            PlayRejection::PolicyDenied.to_string(),
            "playback blocked by autoplay policy"
        );
        assert_eq!(
            PlayRejection::Failed("busy".into()).to_string(),
            "playback rejected: busy"
        );
    }
}
