//! Tenant-ID-keyed credential cache
//!
//! Insert-if-absent map of [`CachedCredential`] entries guarded by an async
//! RwLock. Reads take the shared lock; a miss upgrades to the exclusive
//! lock with a re-check, so two racing first requests for one tenant still
//! produce a single entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info};

use provider::{AccessToken, CredentialProvider};

use crate::cached::CachedCredential;
use crate::error::{Error, Result};

/// Deadline applied to each underlying token fetch unless overridden.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-tenant credential cache shared by all concurrent credential requests.
pub struct CredentialCache {
    entries: RwLock<HashMap<String, Arc<CachedCredential>>>,
    fetch_timeout: Duration,
}

impl CredentialCache {
    /// Create a cache whose entries apply `fetch_timeout` to token fetches.
    pub fn new(fetch_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            fetch_timeout,
        }
    }

    /// Get or create the cache entry for a tenant.
    ///
    /// The first request asks the provider for a tenant-scoped fetcher and
    /// wraps it; later requests return the same entry.
    pub async fn resolve(
        &self,
        tenant_id: &str,
        provider: &Arc<dyn CredentialProvider>,
    ) -> Result<Arc<CachedCredential>> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(tenant_id) {
                return Ok(entry.clone());
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(tenant_id) {
            return Ok(entry.clone());
        }

        let fetcher = provider
            .credential_for_tenant(tenant_id)
            .map_err(|e| Error::Provider(e.to_string()))?;
        let entry = Arc::new(CachedCredential::new(
            tenant_id.to_string(),
            fetcher,
            self.fetch_timeout,
        ));
        entries.insert(tenant_id.to_string(), entry.clone());
        debug!(tenant = tenant_id, "created tenant credential entry");
        Ok(entry)
    }

    /// Resolve the tenant's entry and fetch a token in one step.
    pub async fn access_token(
        &self,
        tenant_id: &str,
        provider: &Arc<dyn CredentialProvider>,
        scopes: &[String],
    ) -> Result<AccessToken> {
        let entry = self.resolve(tenant_id, provider).await?;
        entry.get_token(scopes).await
    }

    /// Drop every entry. Called on logout, atomically with tearing down the
    /// account state.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        info!(entries = dropped, "cleared credential cache");
    }

    /// Number of cached tenant entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}
