use thiserror::Error;

/// The only failure that crosses the manager boundary
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("informer cache never completed syncing for type {kind} in namespace {namespace}")]
    NeverSynced { namespace: String, kind: &'static str },

    #[error("log manager is already running")]
    AlreadyRunning,
}
