//! Error types for credential cache operations

use std::time::Duration;

/// Errors from credential cache operations.
///
/// Clone-able so single-flight followers receive the leader's failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("credential provider error: {0}")]
    Provider(String),

    #[error("token fetch failed: {0}")]
    Fetch(String),

    #[error("token fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Result alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
