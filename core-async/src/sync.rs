//! Synchronization primitives.
//!
//! Async-aware primitives from `tokio::sync`. Short, non-async critical
//! sections elsewhere in the workspace use `parking_lot` locks instead; the
//! types here are for state that is held across `.await` points or for
//! message passing between tasks.
//!
//! ```rust
//! use core_async::sync::watch;
//!
//! let (tx, rx) = watch::channel(0usize);
//! tx.send_replace(3);
//! assert_eq!(*rx.borrow(), 3);
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
