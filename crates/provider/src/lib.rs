//! Credential provider abstraction
//!
//! Defines the two capabilities the resolution engine consumes:
//! [`CredentialProvider`] produces per-tenant token fetchers, and
//! [`TokenFetcher`] acquires scoped access tokens. Login flows (browser,
//! device code, service principal) live outside this workspace; whatever
//! credential they produce is handed in as a `CredentialProvider`.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn TokenFetcher>`, `Arc<dyn CredentialProvider>`).

pub mod static_provider;

pub use static_provider::StaticCredentialProvider;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use common::SecretString;

/// Errors from credential provider operations.
///
/// Clone-able (String payloads) so a cached credential can hand the same
/// failure to every caller waiting on one in-flight refresh.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The identity lacks rights on the requested tenant. Expected on guest
    /// tenants; discovery skips the tenant silently.
    #[error("authentication denied: {0}")]
    Denied(String),

    /// The provider cannot produce a fetcher (network/config).
    #[error("credential provider unavailable: {0}")]
    Unavailable(String),

    /// The underlying token acquisition failed.
    #[error("token fetch failed: {0}")]
    Fetch(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A scoped access token with its absolute expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer token value, redacted in logs
    pub token: SecretString,
    /// Absolute expiration time
    pub expires_at: SystemTime,
}

impl AccessToken {
    /// Create a token expiring `ttl` from now.
    pub fn with_ttl(token: impl Into<SecretString>, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            expires_at: SystemTime::now() + ttl,
        }
    }

    /// Whether the token expires within `margin` from now.
    ///
    /// A token inside the margin is treated as stale so callers never hand
    /// out a token that dies mid-request.
    pub fn expires_within(&self, margin: Duration) -> bool {
        SystemTime::now() + margin >= self.expires_at
    }
}

/// A token-fetching capability bound to one tenant (or the home scope).
pub trait TokenFetcher: Send + Sync {
    /// Acquire an access token for the requested scopes.
    fn fetch<'a>(
        &'a self,
        scopes: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>>;
}

/// Produces token fetchers: one for the identity's home scope (used for
/// tenant discovery before tenant IDs are known) and one per tenant.
///
/// Both operations are factories, not network calls; the network happens
/// inside the returned fetcher.
pub trait CredentialProvider: Send + Sync {
    /// Fetcher for the home/common scope.
    fn common_credential(&self) -> Result<Arc<dyn TokenFetcher>>;

    /// Fetcher scoped to the given tenant.
    fn credential_for_tenant(&self, tenant_id: &str) -> Result<Arc<dyn TokenFetcher>>;
}
