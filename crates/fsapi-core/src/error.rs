//! Error types for the filesystem API

use thiserror::Error;

/// Startup and configuration errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Outcome of a content operation that did not succeed.
///
/// Every variant except [`ContentError::Io`] is a domain error: an
/// anticipated precondition failure reported back to the caller as a
/// structured result. `Io` is a fault and is never recovered by the engine.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("cannot overwrite an existing directory")]
    CannotOverwriteDirectory,

    #[error("no write permission")]
    NotWriteable,

    #[error("parent directory is not writeable")]
    ParentNotWriteable,

    #[error("received chunk for file that does not exist")]
    ChunkTargetMissing,

    #[error("path does not exist")]
    PathNotFound,

    #[error("cannot delete the root directory")]
    CannotDeleteRoot,

    #[error("destination path already exists")]
    DestinationExists,

    #[error("destination folder does not exist")]
    DestinationFolderMissing,

    #[error("cannot copy a directory")]
    CannotCopyDirectory,

    #[error("path must be a directory")]
    NotADirectory,

    #[error("unknown content action {0}")]
    UnknownAction(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ContentError {
    /// True for unanticipated filesystem failures
    pub fn is_fault(&self) -> bool {
        matches!(self, ContentError::Io(_))
    }
}

pub type ContentResult<T> = std::result::Result<T, ContentError>;
