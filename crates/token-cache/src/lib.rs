//! Per-tenant credential memoization
//!
//! One [`CachedCredential`] exists per tenant for the lifetime of a session,
//! held in a [`CredentialCache`] keyed by tenant ID. Each entry memoizes the
//! most recently fetched access token and single-flights refresh: concurrent
//! callers of an expiring entry share one underlying fetch and all observe
//! its result, success or failure. Failed refreshes are never cached.
//!
//! Entry lifecycle:
//! 1. First credential lookup for a tenant → `CredentialCache::resolve`
//!    asks the provider for a tenant-scoped fetcher and wraps it
//! 2. Token requests hit the memoized value while it stays outside the
//!    expiry safety margin
//! 3. A stale entry refreshes once; followers wait on the same flight
//! 4. Logout clears the whole map atomically

pub mod cache;
pub mod cached;
pub mod error;

pub use cache::CredentialCache;
pub use cached::CachedCredential;
pub use error::{Error, Result};
