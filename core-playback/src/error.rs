//! # Playback Error Types
//!
//! Errors produced while driving media instances. None of them reach the
//! interaction caller: attempts and the lifecycle manager absorb them and the
//! caller only observes a [`RequestOutcome`](crate::request::RequestOutcome).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::instance::InstanceState;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Media Errors
    // ========================================================================
    /// The surface never reported readiness within the timeout.
    #[error("Media did not become ready within {0:?}")]
    LoadTimeout(Duration),

    /// The surface reported a decode or network failure while loading.
    #[error("Failed to load media: {0}")]
    LoadError(String),

    /// The platform blocked playback absent a user gesture.
    #[error("Playback denied by autoplay policy")]
    PlaybackPolicyDenied,

    /// Any other play rejection.
    #[error("Playback failed: {0}")]
    PlaybackFailure(String),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The instance was disposed while an operation was in flight.
    #[error("Media instance disposed")]
    Disposed,

    /// A state change the instance state machine does not allow.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: InstanceState,
        to: InstanceState,
    },

    /// The host could not provide a surface.
    #[error("Media surface unavailable: {0}")]
    SurfaceUnavailable(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Invalid playback configuration.
    #[error("Invalid playback configuration: {0}")]
    Config(String),

    /// Error from the runtime layer (host wiring, bridges).
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl PlaybackError {
    /// Returns `true` if a fresh load/play attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadTimeout(_)
                | PlaybackError::LoadError(_)
                | PlaybackError::PlaybackFailure(_)
        )
    }

    /// Returns `true` for failures that are normal platform behaviour rather
    /// than faults (autoplay denial).
    pub fn is_expected_degradation(&self) -> bool {
        matches!(self, PlaybackError::PlaybackPolicyDenied)
    }

    /// Coarse classification used in outcomes and events.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PlaybackError::LoadTimeout(_) => FailureKind::LoadTimeout,
            PlaybackError::LoadError(_) => FailureKind::LoadError,
            PlaybackError::PlaybackPolicyDenied => FailureKind::PolicyDenied,
            PlaybackError::PlaybackFailure(_) => FailureKind::PlaybackFailure,
            PlaybackError::Disposed => FailureKind::Disposed,
            PlaybackError::SurfaceUnavailable(_) => FailureKind::SurfaceUnavailable,
            PlaybackError::InvalidTransition { .. }
            | PlaybackError::Config(_)
            | PlaybackError::Runtime(_) => FailureKind::Internal,
        }
    }
}

/// Why a media instance did not reach `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    LoadTimeout,
    LoadError,
    PolicyDenied,
    PlaybackFailure,
    Disposed,
    SurfaceUnavailable,
    Internal,
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
