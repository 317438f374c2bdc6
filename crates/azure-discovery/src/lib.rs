//! Tenant and subscription discovery
//!
//! The [`Discovery`] trait is the engine's view of the remote listing API:
//! enumerate the tenants visible to the top-level identity, and enumerate
//! the subscriptions visible under one tenant-scoped credential.
//! [`RestDiscovery`] implements it against the resource manager REST
//! endpoints of a [`common::CloudEnvironment`].
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn Discovery>`).

pub mod error;
pub mod rest;

pub use error::{Error, ErrorClass, Result, error_for_status};
pub use rest::RestDiscovery;

use std::future::Future;
use std::pin::Pin;

use provider::TokenFetcher;

/// One subscription as reported by the listing API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Subscription ID (opaque, case-insensitively unique per environment)
    pub id: String,
    /// Human-readable display name
    pub display_name: String,
}

/// Remote discovery/listing API.
pub trait Discovery: Send + Sync {
    /// List the tenant IDs visible to the home-scope credential.
    fn list_tenants<'a>(
        &'a self,
        credential: &'a dyn TokenFetcher,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;

    /// List the subscriptions visible under a tenant-scoped credential.
    fn list_subscriptions<'a>(
        &'a self,
        credential: &'a dyn TokenFetcher,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SubscriptionInfo>>> + Send + 'a>>;
}
