//! Error types for the inventory sync pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Everything that can abort a sync run.
///
/// Unresolvable identifiers are not represented here: they are dropped
/// where they are found and only show up in debug logs.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The cloud rejected the login or answered without credentials.
    #[error("login failed, check email/password: {0}")]
    AuthFailure(String),

    /// The account has no locations to import from.
    #[error("no locations found in account")]
    EmptyInventory,

    /// A cloud request never got an HTTP response.
    #[error("connection to {url} failed: {reason}")]
    NetworkFailure { url: String, reason: String },

    /// A cloud request got an error status.
    #[error("HTTP {status} from {url}: {body}")]
    HttpFailure {
        url: String,
        status: u16,
        body: String,
    },

    /// The hub could not be reached at all.
    #[error("cannot reach device at {device}: {reason}")]
    DeviceUnreachable { device: String, reason: String },

    /// The hub answered the import with an error status.
    #[error("import failed, HTTP {status}: {body}")]
    ImportRejected { status: u16, body: String },

    /// A document (cloud response, snapshot, hub reply) was not the expected JSON.
    #[error("failed to parse {context}: {reason}")]
    ParseFailure { context: String, reason: String },

    /// Local file access failed.
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of [`SyncError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    EmptyInventory,
    Network,
    Parse,
    Io,
}

impl SyncError {
    pub fn parse(context: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::ParseFailure {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::AuthFailure(_) => ErrorKind::Auth,
            SyncError::EmptyInventory => ErrorKind::EmptyInventory,
            SyncError::NetworkFailure { .. }
            | SyncError::HttpFailure { .. }
            | SyncError::DeviceUnreachable { .. }
            | SyncError::ImportRejected { .. } => ErrorKind::Network,
            SyncError::ParseFailure { .. } => ErrorKind::Parse,
            SyncError::Io { .. } => ErrorKind::Io,
        }
    }
}
