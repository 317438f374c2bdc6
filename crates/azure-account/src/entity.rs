//! Account and subscription entities
//!
//! `AccountEntity` is the resolved view of one signed-in identity: its
//! environment, the tenants that contributed subscriptions, the
//! deduplicated subscription list, and the selected working set. It is
//! produced whole by aggregation and replaced whole; nothing mutates it
//! in place except subscription selection.

use serde::{Deserialize, Serialize};

use common::CloudEnvironment;

/// A subscription visible to the signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEntity {
    /// Subscription ID, case-insensitively unique within an environment
    pub id: String,
    /// Human-readable display name
    pub display_name: String,
    /// The tenant this subscription was listed under
    pub tenant_id: String,
    /// Environment name the subscription belongs to
    pub environment: String,
    /// Whether the subscription is part of the selected working set
    pub selected: bool,
}

/// The resolved state of one signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEntity {
    /// Endpoint set in use
    pub environment: CloudEnvironment,
    /// Signed-in principal, when the login flow reported one
    pub email: Option<String>,
    /// Tenants that contributed at least one subscription
    pub tenant_ids: Vec<String>,
    /// All discovered subscriptions, deduplicated by ID
    pub subscriptions: Vec<SubscriptionEntity>,
    /// The selected working set (subscriptions flagged `selected`)
    pub selected_subscriptions: Vec<SubscriptionEntity>,
    /// Whether the account holds a usable, discovered view
    pub authenticated: bool,
    /// Why `authenticated` is false, when a discovery failure was recorded
    pub last_error: Option<String>,
}

impl AccountEntity {
    /// Fresh entity for an environment; the login flow that produced the
    /// credential sets `authenticated` and may pre-seed `tenant_ids`.
    pub fn new(environment: CloudEnvironment) -> Self {
        Self {
            environment,
            email: None,
            tenant_ids: Vec::new(),
            subscriptions: Vec::new(),
            selected_subscriptions: Vec::new(),
            authenticated: false,
            last_error: None,
        }
    }

    /// Pre-seed known tenant IDs, skipping tenant discovery at initialize.
    pub fn with_tenants(mut self, tenant_ids: Vec<String>) -> Self {
        self.tenant_ids = tenant_ids;
        self
    }

    /// Look up a discovered subscription by ID, case-insensitively.
    pub fn find_subscription(&self, subscription_id: &str) -> Option<&SubscriptionEntity> {
        self.subscriptions
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(subscription_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(id: &str, tenant: &str) -> SubscriptionEntity {
        SubscriptionEntity {
            id: id.into(),
            display_name: format!("sub {id}"),
            tenant_id: tenant.into(),
            environment: "AzureCloud".into(),
            selected: false,
        }
    }

    #[test]
    fn find_subscription_is_case_insensitive() {
        let mut entity = AccountEntity::new(CloudEnvironment::public());
        entity.subscriptions = vec![subscription("Sub-A", "t1")];

        let found = entity.find_subscription("sub-a").unwrap();
        assert_eq!(found.id, "Sub-A");
        assert!(entity.find_subscription("sub-b").is_none());
    }

    #[test]
    fn subscription_entity_serializes() {
        let sub = subscription("sub-a", "t1");
        let json = serde_json::to_string(&sub).unwrap();
        assert!(json.contains("\"id\":\"sub-a\""));
        assert!(json.contains("\"tenant_id\":\"t1\""));

        let back: SubscriptionEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sub);
    }

    #[test]
    fn new_entity_starts_unauthenticated_and_empty() {
        let entity = AccountEntity::new(CloudEnvironment::public());
        assert!(!entity.authenticated);
        assert!(entity.tenant_ids.is_empty());
        assert!(entity.subscriptions.is_empty());
        assert!(entity.last_error.is_none());
    }
}
