//! Common error types for tunetag

use thiserror::Error;

/// Common result type for tunetag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bootstrapping a tunetag service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration discovery, loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
