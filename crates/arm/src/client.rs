use std::sync::Arc;

use serde::de::DeserializeOwned;
use vmwatch_core::config::Config;
use vmwatch_core::error::{Result, VmwatchError};

use crate::token::TokenCache;

/// Authenticated GET client for the management API.
///
/// Relative paths resolve against the configured endpoint; absolute URLs
/// (pagination continuation links) pass through untouched. Every request
/// carries a bearer token from the injected cache and the config's bounded
/// timeout.
pub struct ArmClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenCache>,
}

impl ArmClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| VmwatchError::Transport(format!("failed to build http client: {e}")))?;
        let tokens = Arc::new(TokenCache::new(cfg, http.clone()));
        Ok(Self {
            http,
            base_url: cfg.arm_endpoint.clone(),
            tokens,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path_or_url: &str) -> Result<T> {
        self.get_with_query(path_or_url, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path_or_url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.tokens.get().await?;
        let url = self.resolve(path_or_url);

        let mut req = self.http.get(&url).bearer_auth(&token);
        if !query.is_empty() {
            req = req.query(query);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| VmwatchError::Transport(format!("GET {url} failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| VmwatchError::Transport(format!("GET {url} failed reading body: {e}")))?;
        if !status.is_success() {
            return Err(VmwatchError::ArmRequest {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| VmwatchError::Schema(format!("GET {url}: {e}")))
    }

    fn resolve(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("https://") || path_or_url.starts_with("http://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        }
    }
}
