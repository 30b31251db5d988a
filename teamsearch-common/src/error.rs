//! Common error types for TeamSearch workers

use thiserror::Error;

/// Common result type for TeamSearch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across TeamSearch workers
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Broker connection, channel, or acknowledgement error
    #[error("Queue error: {0}")]
    Queue(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
