//! Account session façade
//!
//! Owns the account lifecycle: entity and provider attached → initialized
//! (authenticated or not) → logged out. Credential lookups resolve a
//! subscription to its owning tenant and delegate to the per-tenant
//! credential cache.
//!
//! The session state sits behind one RwLock. Credential lookups hold the
//! read guard while touching the cache, and logout takes the write guard
//! before tearing anything down, so logout happens-after every in-flight
//! lookup and the cache can never re-acquire an entry for a dead session.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use azure_discovery::Discovery;
use common::CloudEnvironment;
use provider::CredentialProvider;
use token_cache::{CachedCredential, CredentialCache};

use crate::aggregator::{self, InitializeOptions};
use crate::entity::{AccountEntity, SubscriptionEntity};
use crate::error::{Error, Result};
use crate::legacy::LegacyCredential;
use crate::selector;

struct Inner {
    entity: Option<AccountEntity>,
    provider: Option<Arc<dyn CredentialProvider>>,
    initialized: bool,
}

/// One signed-in account and its resolved view.
pub struct AccountSession {
    inner: RwLock<Inner>,
    cache: CredentialCache,
}

impl AccountSession {
    /// Create a session for an entity produced by a login flow. A
    /// credential provider must be attached before `initialize`.
    pub fn new(entity: AccountEntity) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entity: Some(entity),
                provider: None,
                initialized: false,
            }),
            cache: CredentialCache::default(),
        }
    }

    /// Create a session with the provider already attached.
    pub fn with_provider(entity: AccountEntity, provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entity: Some(entity),
                provider: Some(provider),
                initialized: false,
            }),
            cache: CredentialCache::default(),
        }
    }

    /// Attach (or replace) the credential provider.
    pub async fn attach_provider(&self, provider: Arc<dyn CredentialProvider>) {
        let mut inner = self.inner.write().await;
        inner.provider = Some(provider);
    }

    /// Run discovery and swap in the aggregated snapshot.
    ///
    /// Requires an entity and provider. Not designed for concurrent calls;
    /// the aggregation itself runs without holding the session lock, and
    /// the finished snapshot replaces the state atomically.
    pub async fn initialize(
        &self,
        discovery: Arc<dyn Discovery>,
        options: &InitializeOptions,
    ) -> Result<()> {
        let (entity, provider) = {
            let inner = self.inner.read().await;
            let entity = inner.entity.clone().ok_or(Error::NotConfigured)?;
            let provider = inner.provider.clone().ok_or(Error::NotConfigured)?;
            (entity, provider)
        };

        let snapshot = aggregator::initialize(entity, provider, discovery, options).await?;

        let mut inner = self.inner.write().await;
        info!(
            authenticated = snapshot.authenticated,
            tenants = snapshot.tenant_ids.len(),
            subscriptions = snapshot.subscriptions.len(),
            "account initialized"
        );
        inner.entity = Some(snapshot);
        inner.initialized = true;
        Ok(())
    }

    /// True only after a successful `initialize` left the account usable.
    pub async fn is_authenticated(&self) -> bool {
        let inner = self.inner.read().await;
        inner.initialized && inner.entity.as_ref().is_some_and(|e| e.authenticated)
    }

    /// All discovered subscriptions.
    pub async fn subscriptions(&self) -> Vec<SubscriptionEntity> {
        let inner = self.inner.read().await;
        inner
            .entity
            .as_ref()
            .map(|e| e.subscriptions.clone())
            .unwrap_or_default()
    }

    /// The selected working set.
    pub async fn selected_subscriptions(&self) -> Vec<SubscriptionEntity> {
        let inner = self.inner.read().await;
        inner
            .entity
            .as_ref()
            .map(|e| e.selected_subscriptions.clone())
            .unwrap_or_default()
    }

    /// Additively select subscriptions by ID (case-insensitive).
    pub async fn select(&self, subscription_ids: &[String]) {
        let mut inner = self.inner.write().await;
        if let Some(entity) = inner.entity.as_mut() {
            selector::select_subscriptions(entity, subscription_ids);
        }
    }

    /// The environment of the signed-in account, if one is attached.
    pub async fn environment(&self) -> Option<CloudEnvironment> {
        let inner = self.inner.read().await;
        inner.entity.as_ref().map(|e| e.environment.clone())
    }

    /// A snapshot of the account entity, if one is attached.
    pub async fn entity(&self) -> Option<AccountEntity> {
        self.inner.read().await.entity.clone()
    }

    /// Scoped credential for a subscription.
    ///
    /// `Ok(None)` when the subscription ID is not in the discovered set;
    /// the caller can check and branch rather than handle a hard failure.
    pub async fn credential(&self, subscription_id: &str) -> Result<Option<Arc<CachedCredential>>> {
        let inner = self.inner.read().await;
        let (tenant_id, provider) = match Self::locate(&inner, subscription_id)? {
            Some(located) => located,
            None => return Ok(None),
        };
        let credential = self.cache.resolve(&tenant_id, &provider).await?;
        Ok(Some(credential))
    }

    /// Scoped credential converted to the legacy shape, for callers still
    /// bound to the older credential interface.
    pub async fn legacy_credential(
        &self,
        subscription_id: &str,
    ) -> Result<Option<LegacyCredential>> {
        let inner = self.inner.read().await;
        let (tenant_id, provider) = match Self::locate(&inner, subscription_id)? {
            Some(located) => located,
            None => return Ok(None),
        };
        let environment = match &inner.entity {
            Some(entity) => entity.environment.clone(),
            None => return Err(Error::NotConfigured),
        };
        let credential = self.cache.resolve(&tenant_id, &provider).await?;
        Ok(Some(LegacyCredential::new(
            environment,
            tenant_id,
            credential,
        )))
    }

    /// Tear down the session: drop the entity, detach the provider, and
    /// clear the credential cache. A new attach + initialize is required
    /// afterward.
    pub async fn logout(&self) {
        let mut inner = self.inner.write().await;
        inner.entity = None;
        inner.provider = None;
        inner.initialized = false;
        self.cache.clear().await;
        info!("account logged out");
    }

    /// The per-tenant credential cache (for observers and tests).
    pub fn credential_cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Check preconditions and resolve a subscription to its owning tenant.
    fn locate(
        inner: &Inner,
        subscription_id: &str,
    ) -> Result<Option<(String, Arc<dyn CredentialProvider>)>> {
        let entity = match &inner.entity {
            Some(entity) if inner.initialized && entity.authenticated => entity,
            _ => return Err(Error::NotAuthenticated),
        };
        let provider = inner.provider.clone().ok_or(Error::NotConfigured)?;
        match entity.find_subscription(subscription_id) {
            Some(subscription) => Ok(Some((subscription.tenant_id.clone(), provider))),
            None => {
                debug!(subscription = subscription_id, "unknown subscription id");
                Ok(None)
            }
        }
    }
}
