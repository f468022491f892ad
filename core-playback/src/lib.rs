//! # Feedback Playback Engine
//!
//! Turns discrete user interactions into short paired audio + visual
//! feedback and guarantees every media resource it spawns is released.
//!
//! ## Overview
//!
//! - **Interaction gate**: audio is never attempted before the first trusted
//!   user interaction ([`gate`])
//! - **Requests**: one request per click/tap with a visual and optionally an
//!   audio [`MediaInstance`] ([`request`])
//! - **Attempts**: load, readiness wait with timeout, play; bounded retries
//!   with linear backoff ([`attempt`], [`readiness`])
//! - **Lifecycle**: live registry, disposal on end/error and an emergency
//!   reaper for instances that never finish ([`lifecycle`])
//! - **Host signals**: pause on hidden, dispose everything on teardown
//!   ([`visibility`])
//!
//! [`FeedbackController`] wires everything together and is what hosts use.
//!
//! ## Autoplay policy
//!
//! Restricted platforms refuse audio without a user gesture. Such a denial
//! ends the audio attempt quietly; the request still succeeds when its visual
//! plays.

pub mod attempt;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod instance;
pub mod lifecycle;
pub mod readiness;
pub mod request;
pub mod visibility;

pub use attempt::{PlaybackAttempt, RetryPolicy};
pub use config::PlaybackConfig;
pub use controller::FeedbackController;
pub use error::{FailureKind, PlaybackError, Result};
pub use gate::{InteractionGate, ReentrancyGate, ReentrancyPermit};
pub use instance::{InstanceId, InstanceState, MediaInstance};
pub use lifecycle::ResourceLifecycleManager;
pub use readiness::{wait_until_ready, Ready, ReadinessError, ReadinessWaiter};
pub use request::{
    AudioOutcome, InteractionEvent, InteractionKind, PlaybackRequest, Point, RequestFactory,
    RequestHandle, RequestId, RequestOutcome,
};
pub use visibility::VisibilityCoordinator;
