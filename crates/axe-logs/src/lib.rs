//! Log tailing core for axe
//!
//! The [`Manager`] watches pods in a set of namespaces and keeps one tail
//! worker running per container, merging every line into one bounded
//! feed of [`LogRecord`]s.
//!
//! Workers are tracked in three flat registries (namespace watches, pod
//! supervisors, container tailers) behind one lock. Cancelling a namespace
//! watch does not by itself stop the pods under it; [`Manager::unwatch`]
//! walks the registries and cancels every worker in that namespace.

mod error;
mod manager;
mod registry;
mod settings;
mod supervisor;
mod tailer;
mod watch;

#[cfg(test)]
mod testing;

pub use error::SyncError;
pub use manager::Manager;
pub use settings::{
    DEFAULT_BUFFER, DEFAULT_LOOKBACK, DEFAULT_RESYNC, DEFAULT_RETRY_INTERVAL, TailSettings,
};

// Re-export types used in our public API
pub use axe_types::{LogRecord, RecordKind};
