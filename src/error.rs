//! Error types for lecture-dl
//!
//! This module provides the error taxonomy for the library:
//! - Domain-specific error types (Store, Remote, Archive)
//! - A top-level [`Error`] enum that every fallible operation returns
//!
//! Per-item transcript failures are deliberately not a distinct error
//! type: the pipeline absorbs them into the run log and continues. A
//! missing transcript is not an error at all (it is an `Ok(None)`).

use thiserror::Error;

/// Result type alias for lecture-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lecture-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "remote.base_url")
        key: Option<String>,
    },

    /// Course context could not be determined (fatal to initialization)
    #[error("context error: {0}")]
    Context(String),

    /// State store operation failed
    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    /// Remote API error
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Archive assembly or delivery error
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Persistent state store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or connect to the backing database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run schema migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored record could not be encoded or decoded
    #[error("corrupt state record: {0}")]
    Corrupted(String),
}

/// Remote API errors
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The curriculum endpoint returned a non-success status
    #[error("curriculum request failed with status {status}")]
    CurriculumStatus {
        /// The HTTP status code returned by the curriculum endpoint
        status: u16,
    },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a payload or URL we cannot interpret
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Archive assembly and delivery errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Writing one entry's content into the archive failed
    #[error("failed to write archive entry {name}: {reason}")]
    Encode {
        /// The entry path that failed to encode
        name: String,
        /// The reason encoding failed
        reason: String,
    },

    /// The ZIP container itself could not be produced
    #[error("ZIP encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Handing the finished archive to the delivery sink failed
    #[error("failed to deliver {name}: {reason}")]
    Deliver {
        /// The archive file name that failed to deliver
        name: String,
        /// The reason delivery failed
        reason: String,
    },
}
