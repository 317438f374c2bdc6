//! Error types and failure classification for discovery calls
//!
//! The aggregator needs to tell an expected "this identity may not
//! enumerate subscriptions here" apart from a real failure: the former is
//! silently skipped, the latter is recorded on the account. `ErrorClass`
//! carries that distinction.

/// Errors from discovery/listing operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identity is not authorized to list on this tenant (401/403).
    /// Expected for guest tenants; classified non-fatal.
    #[error("authentication denied: {0}")]
    Denied(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("listing API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid listing response: {0}")]
    Parse(String),

    #[error("token acquisition failed: {0}")]
    Token(String),
}

/// Result alias for discovery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification driving the aggregator's per-tenant handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected denial — skip the tenant, contribute nothing.
    Denied,
    /// Anything else — record the error, mark the account unauthenticated,
    /// keep processing sibling tenants.
    Fatal,
}

impl Error {
    /// Classify this failure for the aggregator.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Denied(_) => ErrorClass::Denied,
            _ => ErrorClass::Fatal,
        }
    }
}

/// Map a non-success listing response to an error.
///
/// 401/403 mean the identity simply cannot enumerate on this tenant, which
/// is the expected-denial case. Every other status is a hard API failure.
pub fn error_for_status(status: u16, body: String) -> Error {
    match status {
        401 | 403 => Error::Denied(format!("listing endpoint returned {status}: {body}")),
        _ => Error::Api { status, body },
    }
}

impl From<provider::Error> for Error {
    fn from(e: provider::Error) -> Self {
        match e {
            provider::Error::Denied(msg) => Error::Denied(msg),
            other => Error::Token(other.to_string()),
        }
    }
}
