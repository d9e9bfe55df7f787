// Error taxonomy for the core operations. Every variant names the
// repository, archive or path it concerns so the operator always knows
// what a failure refers to. Only `ConfigUnavailable` is fatal; the UI
// reports everything else and keeps running.

use std::path::PathBuf;

use thiserror::Error;

/// Structured outcome of a failed core operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration directory cannot be read at all. Fatal at
    /// startup: without it there is nothing to browse.
    #[error("configuration directory {path} is unavailable: {source}")]
    ConfigUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration entry for a repository has no retrievable
    /// encryption passphrase.
    #[error("repository '{repository}' has no retrievable passphrase")]
    SecretUnavailable { repository: String },

    /// The external tool could not reach or list the repository
    /// (network failure, bad passphrase, timeout).
    #[error("repository '{repository}' is unreachable: {reason}")]
    RepositoryUnreachable { repository: String, reason: String },

    /// The mount point directory could not be created.
    #[error("cannot create mount path {path}: {source}")]
    MountPathCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external mount invocation failed. The just-created mount
    /// directory has already been rolled back when this is returned.
    #[error("mounting '{archive}' from repository '{repository}' failed: {reason}")]
    MountFailed {
        repository: String,
        archive: String,
        reason: String,
    },

    /// The mount target has open file handles. The session stays
    /// registered; the operator may retry after releasing them.
    #[error("'{archive}' from repository '{repository}' is busy; close open files and retry")]
    UnmountBusy { repository: String, archive: String },

    /// The external unmount invocation failed for a reason other than a
    /// busy target. Session and directory remain registered.
    #[error("unmounting '{archive}' from repository '{repository}' failed: {reason}")]
    UnmountFailed {
        repository: String,
        archive: String,
        reason: String,
    },

    /// Mount requested for a pair that is already mounted. State is
    /// unchanged; nothing to act on beyond acknowledgment.
    #[error("'{archive}' from repository '{repository}' is already mounted")]
    AlreadyMounted { repository: String, archive: String },

    /// Unmount requested for a pair with no active session.
    #[error("'{archive}' from repository '{repository}' is not mounted")]
    NotMounted { repository: String, archive: String },

    /// Registry bookkeeping: a session with this key already exists.
    #[error("session for '{archive}' in repository '{repository}' already registered")]
    DuplicateSession { repository: String, archive: String },

    /// Registry bookkeeping: no session with this key exists.
    #[error("no session registered for '{archive}' in repository '{repository}'")]
    NoSuchSession { repository: String, archive: String },
}

pub type Result<T> = std::result::Result<T, Error>;
