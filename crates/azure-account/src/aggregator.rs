//! Tenant fan-out and subscription aggregation
//!
//! `initialize` resolves the tenant list (discovering it with the
//! home-scope credential when unknown), lists subscriptions under every
//! tenant concurrently, and merges the results into a new account
//! snapshot. Each tenant's listing is isolated: denials and timeouts skip
//! the tenant, other failures are recorded on the account without aborting
//! sibling tenants. Only the home-tenant discovery itself is fatal.
//!
//! The merge runs over collected results in tenant-enumeration order, not
//! completion order, so repeated runs against unchanged backend state
//! produce the same subscription set and the same duplicate attribution no
//! matter how the concurrent listings interleave.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use azure_discovery::{Discovery, ErrorClass, SubscriptionInfo};
use provider::CredentialProvider;

use crate::entity::{AccountEntity, SubscriptionEntity};
use crate::error::{Error, Result};

/// Deadline for each listing call (tenant discovery and per-tenant
/// subscription listing) unless overridden.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(60);

/// Knobs for one initialization pass.
#[derive(Debug, Clone)]
pub struct InitializeOptions {
    /// Deadline applied to each individual listing call
    pub list_timeout: Duration,
}

impl Default for InitializeOptions {
    fn default() -> Self {
        Self {
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }
}

/// What one tenant's listing produced.
enum TenantOutcome {
    Listed(Vec<SubscriptionInfo>),
    Denied(String),
    TimedOut,
    Failed(String),
}

/// Run one discovery pass and build the aggregated account snapshot.
///
/// Consumes the starting entity and returns a fresh one; the caller swaps
/// it in atomically so observers never see a half-updated view. The
/// `authenticated` flag set by the login flow is preserved and only ever
/// cleared here.
pub async fn initialize(
    entity: AccountEntity,
    provider: Arc<dyn CredentialProvider>,
    discovery: Arc<dyn Discovery>,
    options: &InitializeOptions,
) -> Result<AccountEntity> {
    let tenants = if entity.tenant_ids.is_empty() {
        discover_tenants(&provider, &discovery, options.list_timeout).await?
    } else {
        entity.tenant_ids.clone()
    };

    let mut tasks = JoinSet::new();
    for (index, tenant_id) in tenants.iter().enumerate() {
        let provider = provider.clone();
        let discovery = discovery.clone();
        let tenant_id = tenant_id.clone();
        let list_timeout = options.list_timeout;
        tasks.spawn(async move {
            let outcome = list_tenant(provider, discovery, &tenant_id, list_timeout).await;
            (index, outcome)
        });
    }

    let mut outcomes: Vec<Option<TenantOutcome>> = Vec::new();
    outcomes.resize_with(tenants.len(), || None);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => warn!(error = %e, "tenant listing task aborted"),
        }
    }

    Ok(merge(entity, &tenants, outcomes))
}

/// Resolve the tenant list with the home-scope credential. Any failure
/// here, including a timeout, is fatal to initialization.
async fn discover_tenants(
    provider: &Arc<dyn CredentialProvider>,
    discovery: &Arc<dyn Discovery>,
    list_timeout: Duration,
) -> Result<Vec<String>> {
    let home = provider
        .common_credential()
        .map_err(|e| Error::Authentication(format!("cannot acquire home credential: {e}")))?;

    match tokio::time::timeout(list_timeout, discovery.list_tenants(home.as_ref())).await {
        Err(_) => Err(Error::Authentication(format!(
            "tenant discovery timed out after {list_timeout:?}"
        ))),
        Ok(Err(e)) => Err(Error::Authentication(format!(
            "tenant discovery failed: {e}"
        ))),
        Ok(Ok(tenants)) => {
            info!(tenants = tenants.len(), "discovered tenants");
            Ok(tenants)
        }
    }
}

/// List one tenant's subscriptions in isolation and classify the outcome.
async fn list_tenant(
    provider: Arc<dyn CredentialProvider>,
    discovery: Arc<dyn Discovery>,
    tenant_id: &str,
    list_timeout: Duration,
) -> TenantOutcome {
    let fetcher = match provider.credential_for_tenant(tenant_id) {
        Ok(fetcher) => fetcher,
        Err(provider::Error::Denied(msg)) => return TenantOutcome::Denied(msg),
        Err(other) => return TenantOutcome::Failed(other.to_string()),
    };

    match tokio::time::timeout(list_timeout, discovery.list_subscriptions(fetcher.as_ref())).await
    {
        Err(_) => TenantOutcome::TimedOut,
        Ok(Err(e)) => match e.class() {
            ErrorClass::Denied => TenantOutcome::Denied(e.to_string()),
            ErrorClass::Fatal => TenantOutcome::Failed(e.to_string()),
        },
        Ok(Ok(subscriptions)) => TenantOutcome::Listed(subscriptions),
    }
}

/// Merge collected outcomes in tenant-enumeration order.
///
/// Subscriptions dedupe on the lower-cased ID, first writer wins. A tenant
/// stays in the tenant list iff it listed at least one subscription —
/// including subscriptions that lose the dedupe, since the tenant
/// legitimately sees them.
fn merge(
    entity: AccountEntity,
    tenants: &[String],
    mut outcomes: Vec<Option<TenantOutcome>>,
) -> AccountEntity {
    let mut authenticated = entity.authenticated;
    let mut last_error = entity.last_error.clone();
    let mut valid_tenants: Vec<String> = Vec::new();
    let mut merged: Vec<SubscriptionEntity> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, tenant_id) in tenants.iter().enumerate() {
        let outcome = outcomes[index]
            .take()
            .unwrap_or_else(|| TenantOutcome::Failed("listing task aborted".into()));
        match outcome {
            TenantOutcome::Denied(reason) => {
                debug!(tenant = %tenant_id, reason = %reason, "subscription listing denied, skipping tenant");
            }
            TenantOutcome::TimedOut => {
                warn!(tenant = %tenant_id, "subscription listing timed out, skipping tenant");
            }
            TenantOutcome::Failed(message) => {
                warn!(tenant = %tenant_id, error = %message, "subscription listing failed");
                authenticated = false;
                last_error = Some(message);
            }
            TenantOutcome::Listed(subscriptions) => {
                if !subscriptions.is_empty() {
                    valid_tenants.push(tenant_id.clone());
                }
                for info in subscriptions {
                    if !seen.insert(info.id.to_ascii_lowercase()) {
                        debug!(subscription = %info.id, tenant = %tenant_id, "duplicate subscription id, keeping first");
                        continue;
                    }
                    merged.push(SubscriptionEntity {
                        id: info.id,
                        display_name: info.display_name,
                        tenant_id: tenant_id.clone(),
                        environment: entity.environment.name.clone(),
                        selected: false,
                    });
                }
            }
        }
    }

    if merged.is_empty() {
        authenticated = false;
    }

    info!(
        tenants = valid_tenants.len(),
        subscriptions = merged.len(),
        authenticated,
        "account aggregation complete"
    );

    AccountEntity {
        environment: entity.environment,
        email: entity.email,
        tenant_ids: valid_tenants,
        subscriptions: merged,
        selected_subscriptions: Vec::new(),
        authenticated,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;

    use common::CloudEnvironment;
    use provider::{StaticCredentialProvider, TokenFetcher};

    /// Scripted discovery double. `list_subscriptions` identifies the
    /// tenant by fetching the credential's token, whose value the static
    /// provider is configured to equal the tenant ID.
    #[derive(Default)]
    struct ScriptedDiscovery {
        tenants: Vec<String>,
        plans: HashMap<String, Plan>,
        delays: HashMap<String, Duration>,
        home_failure: Option<Plan>,
    }

    #[derive(Clone)]
    enum Plan {
        Subs(Vec<SubscriptionInfo>),
        Deny,
        Fail,
        Hang,
    }

    impl ScriptedDiscovery {
        fn with_tenants(mut self, tenants: &[&str]) -> Self {
            self.tenants = tenants.iter().map(|t| t.to_string()).collect();
            self
        }

        fn plan(mut self, tenant: &str, plan: Plan) -> Self {
            self.plans.insert(tenant.into(), plan);
            self
        }

        fn subs(self, tenant: &str, ids: &[&str]) -> Self {
            let infos = ids
                .iter()
                .map(|id| SubscriptionInfo {
                    id: id.to_string(),
                    display_name: format!("sub {id}"),
                })
                .collect();
            self.plan(tenant, Plan::Subs(infos))
        }

        fn delay(mut self, tenant: &str, delay: Duration) -> Self {
            self.delays.insert(tenant.into(), delay);
            self
        }

        fn home(mut self, plan: Plan) -> Self {
            self.home_failure = Some(plan);
            self
        }
    }

    impl Discovery for ScriptedDiscovery {
        fn list_tenants<'a>(
            &'a self,
            credential: &'a dyn TokenFetcher,
        ) -> Pin<Box<dyn Future<Output = azure_discovery::Result<Vec<String>>> + Send + 'a>>
        {
            Box::pin(async move {
                let _ = credential.fetch(&[]).await?;
                match &self.home_failure {
                    Some(Plan::Hang) => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Err(azure_discovery::Error::Http("hung".into()))
                    }
                    Some(_) => Err(azure_discovery::Error::Http("connection refused".into())),
                    None => Ok(self.tenants.clone()),
                }
            })
        }

        fn list_subscriptions<'a>(
            &'a self,
            credential: &'a dyn TokenFetcher,
        ) -> Pin<
            Box<dyn Future<Output = azure_discovery::Result<Vec<SubscriptionInfo>>> + Send + 'a>,
        > {
            Box::pin(async move {
                let token = credential.fetch(&[]).await?;
                let tenant = token.token.expose().to_string();
                if let Some(delay) = self.delays.get(&tenant) {
                    tokio::time::sleep(*delay).await;
                }
                match self.plans.get(&tenant) {
                    Some(Plan::Subs(infos)) => Ok(infos.clone()),
                    Some(Plan::Deny) => {
                        Err(azure_discovery::error_for_status(403, "forbidden".into()))
                    }
                    Some(Plan::Fail) => {
                        Err(azure_discovery::Error::Http("connection reset".into()))
                    }
                    Some(Plan::Hang) => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Err(azure_discovery::Error::Http("hung".into()))
                    }
                    None => Ok(Vec::new()),
                }
            })
        }
    }

    /// Provider minting a token whose value equals the tenant ID, so the
    /// scripted discovery can tell tenants apart.
    fn provider_for(tenants: &[&str]) -> Arc<dyn CredentialProvider> {
        let mut provider = StaticCredentialProvider::new("home", Duration::from_secs(3600));
        for tenant in tenants {
            provider = provider.with_tenant(*tenant, *tenant);
        }
        Arc::new(provider)
    }

    fn signed_in_entity() -> AccountEntity {
        let mut entity = AccountEntity::new(CloudEnvironment::public());
        entity.authenticated = true;
        entity
    }

    fn ids(entity: &AccountEntity) -> Vec<&str> {
        entity.subscriptions.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn discovers_tenants_when_unknown() {
        let provider = provider_for(&["t1"]);
        let discovery: Arc<dyn Discovery> = Arc::new(
            ScriptedDiscovery::default()
                .with_tenants(&["t1"])
                .subs("t1", &["s1"]),
        );

        let entity = initialize(
            signed_in_entity(),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await
        .unwrap();

        assert!(entity.authenticated);
        assert_eq!(entity.tenant_ids, vec!["t1"]);
        assert_eq!(ids(&entity), vec!["s1"]);
        assert_eq!(entity.subscriptions[0].tenant_id, "t1");
        assert_eq!(entity.subscriptions[0].environment, "AzureCloud");
    }

    #[tokio::test]
    async fn denied_tenant_is_skipped_silently() {
        let provider = provider_for(&["t1", "t2"]);
        let discovery: Arc<dyn Discovery> = Arc::new(
            ScriptedDiscovery::default()
                .plan("t1", Plan::Deny)
                .subs("t2", &["s1"]),
        );

        let entity = initialize(
            signed_in_entity().with_tenants(vec!["t1".into(), "t2".into()]),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await
        .unwrap();

        assert!(entity.authenticated);
        assert_eq!(entity.tenant_ids, vec!["t2"]);
        assert_eq!(ids(&entity), vec!["s1"]);
        assert!(entity.last_error.is_none());
    }

    #[tokio::test]
    async fn provider_level_denial_also_skips_the_tenant() {
        // "guest" has no registered credential, so the provider denies it
        let provider = provider_for(&["t2"]);
        let discovery: Arc<dyn Discovery> =
            Arc::new(ScriptedDiscovery::default().subs("t2", &["s1"]));

        let entity = initialize(
            signed_in_entity().with_tenants(vec!["guest".into(), "t2".into()]),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await
        .unwrap();

        assert!(entity.authenticated);
        assert_eq!(entity.tenant_ids, vec!["t2"]);
    }

    #[tokio::test]
    async fn listing_failure_is_recorded_but_does_not_abort_siblings() {
        let provider = provider_for(&["t1", "t2"]);
        let discovery: Arc<dyn Discovery> = Arc::new(
            ScriptedDiscovery::default()
                .plan("t1", Plan::Fail)
                .subs("t2", &["s1"]),
        );

        let entity = initialize(
            signed_in_entity().with_tenants(vec!["t1".into(), "t2".into()]),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await
        .unwrap();

        assert!(!entity.authenticated);
        assert_eq!(ids(&entity), vec!["s1"]);
        assert_eq!(entity.tenant_ids, vec!["t2"]);
        let error = entity.last_error.unwrap();
        assert!(error.contains("connection reset"), "got: {error}");
    }

    #[tokio::test]
    async fn zero_subscriptions_forces_unauthenticated() {
        let provider = provider_for(&["t1"]);
        let discovery: Arc<dyn Discovery> =
            Arc::new(ScriptedDiscovery::default().subs("t1", &[]));

        let entity = initialize(
            signed_in_entity().with_tenants(vec!["t1".into()]),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await
        .unwrap();

        assert!(!entity.authenticated);
        assert!(entity.subscriptions.is_empty());
        assert!(entity.tenant_ids.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_attribution_follows_enumeration_order() {
        // t2 finishes long before t1, but the merged entry for the shared
        // ID must still belong to t1, the tenant enumerated first.
        let provider = provider_for(&["t1", "t2"]);
        let discovery: Arc<dyn Discovery> = Arc::new(
            ScriptedDiscovery::default()
                .subs("t1", &["Shared-1"])
                .subs("t2", &["shared-1", "s2"])
                .delay("t1", Duration::from_millis(500))
                .delay("t2", Duration::from_millis(1)),
        );

        let entity = initialize(
            signed_in_entity().with_tenants(vec!["t1".into(), "t2".into()]),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(ids(&entity), vec!["Shared-1", "s2"]);
        assert_eq!(entity.subscriptions[0].tenant_id, "t1");
        // Both tenants listed something, so both stay valid
        assert_eq!(entity.tenant_ids, vec!["t1", "t2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn aggregation_is_deterministic_across_runs() {
        for _ in 0..2 {
            let provider = provider_for(&["t1", "t2", "t3"]);
            let discovery: Arc<dyn Discovery> = Arc::new(
                ScriptedDiscovery::default()
                    .subs("t1", &["a", "b"])
                    .subs("t2", &["B", "c"])
                    .subs("t3", &["C", "d"])
                    .delay("t1", Duration::from_millis(30))
                    .delay("t2", Duration::from_millis(20))
                    .delay("t3", Duration::from_millis(10)),
            );

            let entity = initialize(
                signed_in_entity().with_tenants(vec!["t1".into(), "t2".into(), "t3".into()]),
                provider,
                discovery,
                &InitializeOptions::default(),
            )
            .await
            .unwrap();

            assert_eq!(ids(&entity), vec!["a", "b", "c", "d"]);
            assert_eq!(entity.tenant_ids, vec!["t1", "t2", "t3"]);
        }
    }

    #[tokio::test]
    async fn tenant_with_only_unique_subscriptions_is_retained() {
        // Regression guard for the valid-tenant rule: a tenant whose
        // subscriptions are never duplicated elsewhere still owns them and
        // must stay in the tenant list.
        let provider = provider_for(&["t1"]);
        let discovery: Arc<dyn Discovery> =
            Arc::new(ScriptedDiscovery::default().subs("t1", &["only-here"]));

        let entity = initialize(
            signed_in_entity().with_tenants(vec!["t1".into()]),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(entity.tenant_ids, vec!["t1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_tenant_is_skipped_like_a_denied_one() {
        let provider = provider_for(&["t1", "t2"]);
        let discovery: Arc<dyn Discovery> = Arc::new(
            ScriptedDiscovery::default()
                .plan("t1", Plan::Hang)
                .subs("t2", &["s1"]),
        );

        let entity = initialize(
            signed_in_entity().with_tenants(vec!["t1".into(), "t2".into()]),
            provider,
            discovery,
            &InitializeOptions {
                list_timeout: Duration::from_secs(5),
            },
        )
        .await
        .unwrap();

        assert!(entity.authenticated);
        assert_eq!(ids(&entity), vec!["s1"]);
        assert_eq!(entity.tenant_ids, vec!["t2"]);
        assert!(entity.last_error.is_none());
    }

    #[tokio::test]
    async fn home_discovery_failure_is_fatal() {
        let provider = provider_for(&[]);
        let discovery: Arc<dyn Discovery> =
            Arc::new(ScriptedDiscovery::default().home(Plan::Fail));

        let result = initialize(
            signed_in_entity(),
            provider,
            discovery,
            &InitializeOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(Error::Authentication(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn home_discovery_timeout_is_fatal() {
        let provider = provider_for(&[]);
        let discovery: Arc<dyn Discovery> =
            Arc::new(ScriptedDiscovery::default().home(Plan::Hang));

        let result = initialize(
            signed_in_entity(),
            provider,
            discovery,
            &InitializeOptions {
                list_timeout: Duration::from_secs(5),
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Authentication(_))));
    }
}
