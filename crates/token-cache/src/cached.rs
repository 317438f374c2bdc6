//! Memoizing, single-flighted wrapper around a tenant-scoped fetcher
//!
//! The wrapper keeps the last fetched token and its expiry. A request is
//! served from memory while the token stays outside the safety margin;
//! otherwise one caller (the leader) performs the refresh and every
//! concurrent caller (followers) waits on a watch channel carrying the
//! leader's result. Errors are delivered to all waiters and never cached,
//! so the next request retries.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use provider::{AccessToken, TokenFetcher};

use crate::error::{Error, Result};

/// Tokens expiring within this margin are refreshed rather than served, so
/// a caller never receives a token that dies mid-request.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

type FlightResult = Result<AccessToken>;

/// A tenant-scoped token fetcher with a memoized access token.
///
/// One instance exists per tenant; entries are never shared or merged
/// across tenants.
pub struct CachedCredential {
    tenant_id: String,
    fetcher: Arc<dyn TokenFetcher>,
    fetch_timeout: Duration,
    state: Mutex<FlightState>,
}

struct FlightState {
    token: Option<AccessToken>,
    /// Receiver for the refresh currently underway, if any. Carries `None`
    /// until the leader publishes its result.
    inflight: Option<watch::Receiver<Option<FlightResult>>>,
}

enum Role {
    Leader(watch::Sender<Option<FlightResult>>),
    Follower(watch::Receiver<Option<FlightResult>>),
}

impl CachedCredential {
    /// Wrap a tenant-scoped fetcher.
    pub fn new(tenant_id: String, fetcher: Arc<dyn TokenFetcher>, fetch_timeout: Duration) -> Self {
        Self {
            tenant_id,
            fetcher,
            fetch_timeout,
            state: Mutex::new(FlightState {
                token: None,
                inflight: None,
            }),
        }
    }

    /// The tenant this credential is bound to.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Get an access token for the requested scopes.
    ///
    /// Served from the memoized value when it is still outside
    /// [`EXPIRY_MARGIN`]; otherwise exactly one underlying fetch runs,
    /// shared by all concurrent callers. The fetch honors the configured
    /// deadline.
    pub async fn get_token(&self, scopes: &[String]) -> Result<AccessToken> {
        loop {
            let role = {
                let mut state = self.state.lock().await;
                if let Some(token) = &state.token {
                    if !token.expires_within(EXPIRY_MARGIN) {
                        counter!("token_cache.hit").increment(1);
                        return Ok(token.clone());
                    }
                }
                match &state.inflight {
                    Some(rx) => Role::Follower(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        state.inflight = Some(rx);
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => return self.lead_refresh(tx, scopes).await,
                Role::Follower(rx) => {
                    if let Some(result) = self.follow_refresh(rx).await {
                        return result;
                    }
                    // Leader vanished without publishing; re-enter and retry.
                }
            }
        }
    }

    /// Perform the one underlying fetch and publish the result to followers.
    async fn lead_refresh(
        &self,
        tx: watch::Sender<Option<FlightResult>>,
        scopes: &[String],
    ) -> Result<AccessToken> {
        counter!("token_cache.miss").increment(1);
        debug!(tenant = %self.tenant_id, "refreshing access token");

        let result = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(scopes)).await
        {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(e)) => Err(Error::Fetch(e.to_string())),
            Err(_) => Err(Error::Timeout(self.fetch_timeout)),
        };

        {
            let mut state = self.state.lock().await;
            state.inflight = None;
            match &result {
                Ok(token) => state.token = Some(token.clone()),
                Err(e) => {
                    counter!("token_cache.refresh_error").increment(1);
                    warn!(tenant = %self.tenant_id, error = %e, "token refresh failed");
                }
            }
        }

        // Publish after releasing the lock; send failure just means no
        // followers are waiting.
        let _ = tx.send(Some(result.clone()));
        result
    }

    /// Wait for the in-flight refresh to publish. Returns `None` when the
    /// leader was dropped before publishing, in which case the dead flight
    /// is cleared so a new leader can start.
    async fn follow_refresh(
        &self,
        mut rx: watch::Receiver<Option<FlightResult>>,
    ) -> Option<FlightResult> {
        loop {
            let published = rx.borrow_and_update().clone();
            if let Some(result) = published {
                return Some(result);
            }
            if rx.changed().await.is_err() {
                break;
            }
        }

        let mut state = self.state.lock().await;
        if let Some(current) = &state.inflight {
            if current.has_changed().is_err() {
                state.inflight = None;
            }
        }
        None
    }

    /// Whether a token is currently memoized (regardless of freshness).
    pub async fn has_cached_token(&self) -> bool {
        self.state.lock().await.token.is_some()
    }
}
