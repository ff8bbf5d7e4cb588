//! Crate-wide error type.
//!
//! Errors are stratified into three kinds, matching how the REPL handles them:
//! input errors are caught and printed by the REPL without killing the process;
//! storage errors propagate out of `main` and end the process with a non-zero
//! exit code; and `debug_assert!`-style invariant violations are programmer
//! errors that are never meant to be recovered from at all.
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Failure from the underlying file (open/read/write/seek).
    Io(std::io::Error),
    /// Pager or B-tree invariant violation, or a resource limit (cache full,
    /// misaligned file length). Fatal: the process exits non-zero.
    Storage(String),
    /// Insert rejected a key already present in the table.
    DuplicateKey,
    /// Statement failed to parse or violated a length/range rule. Recovered
    /// locally by the REPL; the statement is discarded, the session continues.
    Input(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::DuplicateKey => write!(f, "Error: Duplicate key."),
            Error::Input(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Build an `Error::Storage` with a formatted message, in the shape used
/// throughout the storage layer: `err!("page {} out of bounds", page_num)`.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::errors::Error::Storage(format!($($arg)*))
    };
}
