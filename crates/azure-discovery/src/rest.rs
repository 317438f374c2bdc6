//! REST implementation of the discovery API
//!
//! Lists tenants and subscriptions from the resource manager endpoints:
//! `GET {endpoint}/tenants?api-version=…` and
//! `GET {endpoint}/subscriptions?api-version=…`. Responses are paged as
//! `{"value": [...], "nextLink": "..."}`; paging is followed until
//! `nextLink` is absent. The bearer token comes from the supplied
//! [`TokenFetcher`] with the environment's management scope.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use common::CloudEnvironment;
use provider::TokenFetcher;

use crate::error::{Error, Result, error_for_status};
use crate::{Discovery, SubscriptionInfo};

/// Listing API version sent on every request.
const API_VERSION: &str = "2020-01-01";

/// Discovery over the resource manager REST API of one environment.
pub struct RestDiscovery {
    client: reqwest::Client,
    environment: CloudEnvironment,
}

/// One page of a listing response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TenantRecord {
    #[serde(rename = "tenantId")]
    tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionRecord {
    #[serde(rename = "subscriptionId")]
    subscription_id: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

impl RestDiscovery {
    /// Create a client for the given environment.
    pub fn new(environment: CloudEnvironment) -> Self {
        Self {
            client: reqwest::Client::new(),
            environment,
        }
    }

    /// Create a client reusing an existing `reqwest::Client` (connection
    /// pooling, caller-configured timeouts).
    pub fn with_client(client: reqwest::Client, environment: CloudEnvironment) -> Self {
        Self {
            client,
            environment,
        }
    }

    fn listing_url(&self, resource: &str) -> String {
        format!(
            "{}/{resource}?api-version={API_VERSION}",
            self.environment.resource_manager_endpoint.trim_end_matches('/')
        )
    }

    /// Fetch a token, then walk every page of a listing.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        credential: &dyn TokenFetcher,
        first_url: String,
    ) -> Result<Vec<T>> {
        let scopes = vec![self.environment.management_scope()];
        let token = credential.fetch(&scopes).await.map_err(Error::from)?;

        let mut records = Vec::new();
        let mut next = Some(first_url);
        let mut pages = 0usize;
        while let Some(url) = next {
            let response = self
                .client
                .get(&url)
                .bearer_auth(token.token.expose())
                .send()
                .await
                .map_err(|e| Error::Http(format!("listing request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<no body>"));
                return Err(error_for_status(status.as_u16(), body));
            }

            let page: Page<T> = response
                .json()
                .await
                .map_err(|e| Error::Parse(format!("invalid listing response: {e}")))?;
            records.extend(page.value);
            next = page.next_link;
            pages += 1;
        }
        debug!(records = records.len(), pages, "listing complete");
        Ok(records)
    }
}

impl Discovery for RestDiscovery {
    fn list_tenants<'a>(
        &'a self,
        credential: &'a dyn TokenFetcher,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let records: Vec<TenantRecord> =
                self.get_paged(credential, self.listing_url("tenants")).await?;
            Ok(records.into_iter().map(|r| r.tenant_id).collect())
        })
    }

    fn list_subscriptions<'a>(
        &'a self,
        credential: &'a dyn TokenFetcher,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SubscriptionInfo>>> + Send + 'a>> {
        Box::pin(async move {
            let records: Vec<SubscriptionRecord> = self
                .get_paged(credential, self.listing_url("subscriptions"))
                .await?;
            Ok(records
                .into_iter()
                .map(|r| SubscriptionInfo {
                    id: r.subscription_id,
                    display_name: r.display_name.unwrap_or_default(),
                })
                .collect())
        })
    }
}
