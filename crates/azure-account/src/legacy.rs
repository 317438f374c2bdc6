//! Legacy credential shape
//!
//! Older SDK surfaces take a credential that carries its environment and
//! tenant and is asked for tokens by *resource URI* rather than by scope.
//! `LegacyCredential` is that shape as a pure mapping over the cached
//! tenant credential: no state of its own, resource → `{resource}/.default`
//! scope conversion at fetch time.

use std::sync::Arc;

use common::CloudEnvironment;
use provider::AccessToken;
use token_cache::CachedCredential;

/// A tenant-scoped credential in the older, resource-oriented shape.
pub struct LegacyCredential {
    environment: CloudEnvironment,
    tenant_id: String,
    inner: Arc<CachedCredential>,
}

impl LegacyCredential {
    /// Wrap a cached tenant credential.
    pub fn new(
        environment: CloudEnvironment,
        tenant_id: String,
        inner: Arc<CachedCredential>,
    ) -> Self {
        Self {
            environment,
            tenant_id,
            inner,
        }
    }

    /// The environment this credential belongs to.
    pub fn environment(&self) -> &CloudEnvironment {
        &self.environment
    }

    /// The tenant this credential is bound to.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Fetch a token for a legacy resource URI.
    pub async fn token(&self, resource: &str) -> token_cache::Result<AccessToken> {
        let scope = format!("{}/.default", resource.trim_end_matches('/'));
        self.inner.get_token(&[scope]).await
    }
}
