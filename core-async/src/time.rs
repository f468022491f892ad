//! Time-related abstractions.
//!
//! `Instant` is Tokio's instant so that paused-clock tests
//! (`#[core_async::test(start_paused)]`) observe virtual time consistently
//! across sleeps, timeouts and elapsed-time measurements.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//! }
//! ```

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::{
    error::Elapsed, interval, sleep, sleep_until, timeout, Instant, Interval, Sleep, Timeout,
};

/// Convenience constructor for millisecond durations read from configuration.
pub fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Returns the current wall-clock time as milliseconds since UNIX_EPOCH.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
