//! Static credential provider — fixed tokens, no token endpoint.
//!
//! Hands out pre-configured token values per tenant. Useful for tests and
//! for embedders that already hold valid tokens (e.g. injected by an outer
//! orchestrator). Tenants without a configured token are treated as denied,
//! which is how a guest tenant behaves against a real identity provider.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::{AccessToken, CredentialProvider, Error, Result, TokenFetcher};

/// Provider returning fixed token values with a fixed time-to-live.
pub struct StaticCredentialProvider {
    home_token: String,
    tenant_tokens: HashMap<String, String>,
    ttl: Duration,
}

impl StaticCredentialProvider {
    /// Create a provider whose home-scope fetcher returns `home_token`.
    pub fn new(home_token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            home_token: home_token.into(),
            tenant_tokens: HashMap::new(),
            ttl,
        }
    }

    /// Register a token for a tenant.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>, token: impl Into<String>) -> Self {
        self.tenant_tokens.insert(tenant_id.into(), token.into());
        self
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn common_credential(&self) -> Result<Arc<dyn TokenFetcher>> {
        Ok(Arc::new(StaticTokenFetcher {
            token: self.home_token.clone(),
            ttl: self.ttl,
        }))
    }

    fn credential_for_tenant(&self, tenant_id: &str) -> Result<Arc<dyn TokenFetcher>> {
        match self.tenant_tokens.get(tenant_id) {
            Some(token) => Ok(Arc::new(StaticTokenFetcher {
                token: token.clone(),
                ttl: self.ttl,
            })),
            None => Err(Error::Denied(format!(
                "no credential configured for tenant {tenant_id}"
            ))),
        }
    }
}

/// Fetcher returning one fixed token value; scopes are ignored.
struct StaticTokenFetcher {
    token: String,
    ttl: Duration,
}

impl TokenFetcher for StaticTokenFetcher {
    fn fetch<'a>(
        &'a self,
        scopes: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>> {
        Box::pin(async move {
            debug!(scopes = scopes.len(), "serving static token");
            Ok(AccessToken::with_ttl(self.token.as_str(), self.ttl))
        })
    }
}
