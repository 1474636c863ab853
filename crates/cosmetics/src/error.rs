//! Error types for catalog operations

/// Errors from catalog fetch and decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("catalog parse error: {0}")]
    Parse(String),

    #[error("catalog returned no items")]
    Empty,
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;
