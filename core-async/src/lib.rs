//! Runtime-agnostic async abstraction layer for the feedback engine.
//!
//! Every `core-*` and `bridge-*` crate depends on this crate instead of
//! reaching for Tokio directly. The surface is intentionally small: the
//! engine needs task spawning, timers, a handful of synchronization
//! primitives and cooperative cancellation.
//!
//! # Modules
//!
//! - `task`: Task spawning and execution
//! - `time`: Sleep, timeouts, instants
//! - `sync`: Channels and async locks
//! - `cancel`: Cooperative cancellation tokens
//! - `runtime`: Runtime construction used by the attribute macros
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

// Racing a wait against cancellation or a deadline is common enough in the
// engine to expose Tokio's `select!` through the facade.
pub use tokio::select;

pub mod cancel;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

// Re-export commonly used types at crate root for convenience
pub use cancel::CancellationToken;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
