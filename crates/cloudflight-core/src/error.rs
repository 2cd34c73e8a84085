//! Error types for Cloudflight core.

use thiserror::Error;

/// Core error type for Cloudflight operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for Cloudflight core operations.
pub type Result<T> = std::result::Result<T, Error>;
