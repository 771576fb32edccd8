//! Error handling for the Fankit pipeline
//!
//! Malformed gcode is never an error (unparseable lines become inert
//! commands), so the error surface is file handling only. All error types
//! use `thiserror`.

use std::path::PathBuf;

use thiserror::Error;

/// Pipeline error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input path does not point at a regular file
    #[error("not a regular file: {path}")]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },
}

/// Result type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
