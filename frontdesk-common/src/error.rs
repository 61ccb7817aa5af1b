//! Common error types for the frontdesk service

use thiserror::Error;

/// Common result type for frontdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the service
///
/// No variant is fatal to the process: every entry point that can fail
/// returns one of these rather than terminating the worker.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage read/write failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation referenced an id absent from a collection
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// State transition not permitted (e.g. responding to a request
    /// that is no longer pending)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
