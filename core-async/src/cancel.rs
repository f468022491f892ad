//! Cooperative cancellation.
//!
//! Re-exports `tokio_util`'s [`CancellationToken`]. A token is cancelled once
//! and stays cancelled; every clone observes the same state, and
//! [`CancellationToken::cancelled`] can be raced against any other suspension
//! point with `futures::select!` or `tokio::select!`.
//!
//! ```rust
//! use core_async::cancel::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let observer = token.clone();
//! token.cancel();
//! assert!(observer.is_cancelled());
//! ```

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
