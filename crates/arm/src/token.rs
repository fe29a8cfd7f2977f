use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use vmwatch_core::config::Config;
use vmwatch_core::error::{Result, VmwatchError};

/// Tokens are treated as expired this many seconds before their actual expiry.
const REFRESH_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Cached OAuth2 client-credentials token for the management API.
///
/// Constructor-injected; no process-global state. The cache slot sits behind
/// a mutex held across the refresh, so concurrent callers that both observe
/// a stale token coalesce onto a single exchange.
pub struct TokenCache {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(cfg: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            token_url: format!("{}/{}/oauth2/v2.0/token", cfg.login_endpoint, cfg.tenant_id),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            scope: format!("{}/.default", cfg.arm_endpoint),
            cached: Mutex::new(None),
        }
    }

    /// Returns a bearer token with more than `REFRESH_SKEW_SECS` of validity
    /// left, refreshing it first when necessary.
    pub async fn get(&self) -> Result<String> {
        let mut slot = self.cached.lock().await;
        if let Some(token) = slot.as_ref()
            && token.expires_at - Utc::now() > Duration::seconds(REFRESH_SKEW_SECS)
        {
            return Ok(token.access_token.clone());
        }

        let refreshed = self.refresh().await?;
        let access_token = refreshed.access_token.clone();
        *slot = Some(refreshed);
        Ok(access_token)
    }

    async fn refresh(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", self.scope.as_str()),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| VmwatchError::Auth(format!("token exchange failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| VmwatchError::Auth(format!("token exchange failed: {e}")))?;
        if !status.is_success() {
            return Err(VmwatchError::Auth(format!(
                "token exchange failed: {status} {body}"
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| VmwatchError::Auth(format!("bad token response: {e}")))?;

        tracing::debug!(expires_in = parsed.expires_in, "arm token refreshed");
        Ok(CachedToken {
            access_token: parsed.access_token,
            expires_at: now + Duration::seconds(parsed.expires_in),
        })
    }
}
