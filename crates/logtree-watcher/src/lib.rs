//! Logtree Watcher - change notification for a directory tree
//!
//! This crate handles the watching side of logtree:
//! - Registering a tree and polling it at a fixed interval
//! - Reporting create, write and remove events, skipping hidden entries
//! - Running the watcher as a background task that logs each change
//!
//! Delivery is best-effort. The event buffer holds a single event, so a
//! consumer that falls behind only sees the most recent change.

mod error;
mod event;
mod task;
mod watcher;

pub use error::{Result, WatchError};
pub use event::{ChangeEvent, ChangeKind};
pub use task::WatchTask;
pub use watcher::{ChangeStream, ChangeWatcher, WatchConfig, WatcherState, DEFAULT_POLL_INTERVAL};
