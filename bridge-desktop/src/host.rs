//! Simulated Media Host Implementation

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    MediaHost, MediaKind, MediaSurface, SurfaceSpec,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::surface::{SimulatedSurface, SurfaceScript};

/// Headless [`MediaHost`] whose surfaces follow per-kind scripts.
///
/// Used for desktop/headless runs and as the test double of the engine:
/// every surface it hands out stays inspectable, so tests can assert how
/// many surfaces were created, which are still attached, and what commands
/// each received.
///
/// # Example
///
/// ```ignore
/// use bridge_desktop::{SimulatedMediaHost, SurfaceScript};
/// use std::time::Duration;
///
/// let host = SimulatedMediaHost::new()
///     .with_audio_script(SurfaceScript::never_ready())
///     .with_visual_script(SurfaceScript::ready_after(Duration::from_millis(5)));
/// ```
pub struct SimulatedMediaHost {
    audio_script: Mutex<SurfaceScript>,
    visual_script: Mutex<SurfaceScript>,
    surfaces: Mutex<Vec<Arc<SimulatedSurface>>>,
    live_surfaces: Arc<AtomicU64>,
    primes: AtomicUsize,
}

impl SimulatedMediaHost {
    /// Surfaces become ready after 20ms; audio clips end after 800ms and the
    /// visual never ends on its own.
    pub fn new() -> Self {
        Self {
            audio_script: Mutex::new(
                SurfaceScript::default().with_clip_duration(core_async::time::millis(800)),
            ),
            visual_script: Mutex::new(SurfaceScript::default()),
            surfaces: Mutex::new(Vec::new()),
            live_surfaces: Arc::new(AtomicU64::new(0)),
            primes: AtomicUsize::new(0),
        }
    }

    pub fn with_audio_script(self, script: SurfaceScript) -> Self {
        *self.audio_script.lock() = script;
        self
    }

    pub fn with_visual_script(self, script: SurfaceScript) -> Self {
        *self.visual_script.lock() = script;
        self
    }

    /// Replace the script used for surfaces created from now on.
    pub fn set_script(&self, kind: MediaKind, script: SurfaceScript) {
        match kind {
            MediaKind::Audio => *self.audio_script.lock() = script,
            MediaKind::Visual => *self.visual_script.lock() = script,
        }
    }

    /// Every surface created so far, in creation order.
    pub fn surfaces(&self) -> Vec<Arc<SimulatedSurface>> {
        self.surfaces.lock().clone()
    }

    pub fn surfaces_of(&self, kind: MediaKind) -> Vec<Arc<SimulatedSurface>> {
        self.surfaces
            .lock()
            .iter()
            .filter(|surface| surface.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.surfaces.lock().len()
    }

    /// Surfaces created and not yet detached.
    pub fn attached_count(&self) -> u64 {
        self.live_surfaces.load(Ordering::SeqCst)
    }

    /// Number of `prime_audio` calls received.
    pub fn prime_count(&self) -> usize {
        self.primes.load(Ordering::SeqCst)
    }

    fn script_for(&self, kind: MediaKind) -> SurfaceScript {
        match kind {
            MediaKind::Audio => self.audio_script.lock().clone(),
            MediaKind::Visual => self.visual_script.lock().clone(),
        }
    }
}

impl Default for SimulatedMediaHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaHost for SimulatedMediaHost {
    fn create_surface(&self, spec: SurfaceSpec) -> Result<Arc<dyn MediaSurface>> {
        let script = self.script_for(spec.kind);
        if let Some(message) = script.create_error {
            return Err(BridgeError::OperationFailed(message));
        }
        if spec.source_uri.trim().is_empty() {
            return Err(BridgeError::SourceRejected {
                source_uri: spec.source_uri,
                reason: "empty source".to_string(),
            });
        }

        let surface = Arc::new(SimulatedSurface::new(
            spec,
            script,
            Arc::clone(&self.live_surfaces),
        ));
        debug!(
            surface = %surface.id(),
            kind = %surface.kind(),
            preload = ?surface.preload(),
            "Created simulated surface"
        );

        self.surfaces.lock().push(Arc::clone(&surface));
        Ok(surface)
    }

    async fn prime_audio(&self) -> Result<()> {
        self.primes.fetch_add(1, Ordering::SeqCst);
        debug!("Audio path primed");
        Ok(())
    }
}
