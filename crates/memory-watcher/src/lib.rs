//! Polling memory watchpoints with bounded change history, an optional
//! background auto-scan worker, and optional freeze write-back
//! (spec.md §4.F).

mod types;
mod watcher;
mod writer;

pub use types::{MemoryChange, WatchKind, WatchRegion, MAX_WATCH_SIZE, MIN_WATCH_SIZE};
pub use watcher::{MemoryWatcher, DEFAULT_HISTORY_CAPACITY};
pub use writer::MemoryWriter;
