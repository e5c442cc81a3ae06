// src/error.rs

//! Crate-wide error type and result alias

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building a distribution kit
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapped I/O error from the standard library
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure with context (both placement strategies exhausted,
    /// unreadable ledger store, malformed record, ...)
    #[error("I/O error: {0}")]
    IoError(String),

    /// An expected file or directory is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// A binary could not be parsed or its dependencies resolved
    #[error("scan failed: {0}")]
    ScanError(String),

    /// An external tool is missing, failed, or timed out
    #[error("tool failed: {0}")]
    Tool(String),

    /// The configuration violates a precondition of the pipeline
    #[error("configuration error: {0}")]
    Config(String),
}
