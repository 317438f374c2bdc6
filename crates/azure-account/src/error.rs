//! Error types for account operations

/// Errors from account session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential lookup before a successful initialize, or after logout.
    #[error("not authenticated: log in and initialize the account first")]
    NotAuthenticated,

    /// The session is missing its entity or credential provider.
    #[error("account is not configured with an entity and credential provider")]
    NotConfigured,

    /// Home-tenant discovery failed; initialization cannot proceed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Credential cache failure while resolving a scoped credential.
    #[error(transparent)]
    Cache(#[from] token_cache::Error),
}

/// Result alias for account operations.
pub type Result<T> = std::result::Result<T, Error>;
