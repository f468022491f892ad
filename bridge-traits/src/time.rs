//! Time source abstraction.
//!
//! Wall-clock timestamps attached to interactions and events come from an
//! injected [`Clock`] so tests can pin them. Timer arithmetic inside the
//! engine uses `core_async::time::Instant` instead.

use chrono::{DateTime, Utc};

use crate::platform::PlatformSendSync;

/// Wall-clock time source.
pub trait Clock: PlatformSendSync {
    /// Get current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Get current Unix timestamp in milliseconds
    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock implementation using actual system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
