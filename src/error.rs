//! error.rs – argument and input errors that end the run with exit code 2.
//!
//! Everything else travels as a plain `anyhow::Error` and ends with exit code 1.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error(
        "Expected 0 args (use configured paths), 2 args (two files), or 12 args (two files + 5 sheet selectors each); got {0}."
    )]
    ArgCount(usize),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Expected exactly {expected} sheet selectors, got {got}.")]
    SelectorCount { expected: usize, got: usize },

    #[error("Worksheet index {index} is out of range (1..{count}).")]
    IndexOutOfRange { index: i64, count: usize },

    #[error("Worksheet not found: '{0}'")]
    SheetNotFound(String),
}

impl UsageError {
    pub const EXIT_CODE: u8 = 2;
}

/// Finds a `UsageError` anywhere in an `anyhow` chain.
pub fn usage_error(err: &anyhow::Error) -> Option<&UsageError> {
    err.chain().find_map(|e| e.downcast_ref::<UsageError>())
}
