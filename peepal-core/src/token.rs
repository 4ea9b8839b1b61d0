//! Cache for the directions provider's short-lived bearer token.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::model::ProviderToken;
use crate::ports::{PortError, TokenPort};

/// Holds at most one provider token and refreshes it when absent or expired.
///
/// Readers see either the previous token or the complete new one. Refreshes are
/// single-flight: callers that find the token stale while a refresh is running
/// wait for it and reuse its result.
pub struct TokenCache {
    port: Arc<dyn TokenPort>,
    cached: RwLock<Option<ProviderToken>>,
    refresh: Mutex<()>,
    safety_margin: TimeDelta,
}

impl TokenCache {
    /// Cache over `port`, expiring tokens `safety_margin_secs` before the provider does.
    #[must_use]
    pub fn new(port: Arc<dyn TokenPort>, safety_margin_secs: i64) -> Self {
        Self {
            port,
            cached: RwLock::new(None),
            refresh: Mutex::new(()),
            safety_margin: TimeDelta::try_seconds(safety_margin_secs).unwrap_or_default(),
        }
    }

    /// Current token value, fetching a new one when needed.
    ///
    /// # Errors
    ///
    /// Returns the [`PortError`] of a failed refresh; the cache is left unchanged.
    pub async fn get_token(&self) -> Result<String, PortError> {
        if let Some(value) = self.fresh(Utc::now()).await {
            return Ok(value);
        }

        let _refreshing = self.refresh.lock().await;
        if let Some(value) = self.fresh(Utc::now()).await {
            return Ok(value);
        }

        let issued_at = Utc::now();
        let issued = self.port.issue_token().await?;
        let expires_at = self.expiry(issued_at, issued.expires_in_seconds)?;
        tracing::debug!(%expires_at, "refreshed provider token");

        let value = issued.access_token;
        *self.cached.write().await = Some(ProviderToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    /// Snapshot of the cached token, fresh or not.
    pub async fn current(&self) -> Option<ProviderToken> {
        self.cached.read().await.clone()
    }

    async fn fresh(&self, now: DateTime<Utc>) -> Option<String> {
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh_at(now))
            .map(|token| token.value.clone())
    }

    fn expiry(&self, issued_at: DateTime<Utc>, ttl_secs: i64) -> Result<DateTime<Utc>, PortError> {
        TimeDelta::try_seconds(ttl_secs)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .and_then(|expiry| expiry.checked_sub_signed(self.safety_margin))
            .ok_or_else(|| PortError::Decode(format!("token lifetime out of range: {ttl_secs}s")))
    }
}
