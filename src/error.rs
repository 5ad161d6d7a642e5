//! Error kinds surfaced by the engine, per the filesystem's error-handling
//! design. Every fallible operation in this crate returns `Result<T, FsError>`.

use std::io;

/// All the ways an engine operation can fail.
///
/// `Display` on this type is the exact user-visible string a command prints
/// on failure; the shell never formats its own error text, it just prints
/// `{err}`.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("invalid directory path")]
    BadPath,

    #[error("FILE NAME TOO LONG")]
    NameTooLong,

    #[error("PATH NOT FOUND")]
    PathNotFound,

    #[error("FILE NOT FOUND")]
    FileNotFound,

    #[error("EXIST")]
    Exists,

    #[error("NOT EMPTY")]
    NotEmpty,

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("CANNOT CREATE FILE")]
    OutOfSpace,

    #[error("invalid option(s)")]
    InvalidOption,

    #[error("filesystem is corrupted")]
    CorruptFs,

    #[error("image I/O error: {0}")]
    ImageIoError(#[from] io::Error),
}
