//! Multi-tenant account resolution
//!
//! Combines the other crates into the account façade: discover every tenant
//! and subscription reachable by a signed-in identity, aggregate them into
//! one deduplicated account view, narrow the working set by selection, and
//! hand out memoized per-tenant credentials for any subscription.
//!
//! Account lifecycle:
//! 1. A login flow produces an [`AccountEntity`] and a credential provider
//!    and attaches both to an [`AccountSession`]
//! 2. `initialize` fans out per-tenant discovery, isolating per-tenant
//!    failures, and swaps the aggregated snapshot in atomically
//! 3. `select` marks the subscriptions downstream tools operate on
//! 4. `credential`/`legacy_credential` resolve a subscription to its
//!    tenant's cached credential
//! 5. `logout` tears down the entity, the provider, and the credential
//!    cache in one step

pub mod aggregator;
pub mod entity;
pub mod error;
pub mod legacy;
pub mod selector;
pub mod session;

pub use aggregator::{DEFAULT_LIST_TIMEOUT, InitializeOptions};
pub use entity::{AccountEntity, SubscriptionEntity};
pub use error::{Error, Result};
pub use legacy::LegacyCredential;
pub use selector::select_subscriptions;
pub use session::AccountSession;
