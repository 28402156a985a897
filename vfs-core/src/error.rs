use std::io;

use thiserror::Error;

/// The §7 error taxonomy, propagated as `Result<T, Error>` instead of a
/// consumed-on-read last-error slot.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised by the handful of operations that would only make sense before
    /// a `Vfs` exists; unreachable through the safe API (construction *is*
    /// initialization) but kept for interface fidelity with §7.
    #[error("vfs not initialized yet")]
    NotInitializedYet,

    #[error("vfs already initialized")]
    AlreadyInitialized,

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("generic failure: {0}")]
    Generic(String),

    #[error("no root paths defined")]
    NoRootPathsDefined,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("in use: {0}")]
    InUse(String),

    #[error("cannot manipulate archives: {0}")]
    CantManipulateArchives(String),

    #[error("not an archive: {0}")]
    NotAnArchive(String),

    #[error("invalid archive format: {0}")]
    InvalidArchiveFormat(String),

    #[error("missing filters: {0:?}")]
    MissingFilters(Vec<String>),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
