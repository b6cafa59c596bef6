use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::config::LlmConfig;
use crate::error::{AlmanacError, Result};

/// Tokens are refreshed this long before the issuer says they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

enum CredentialSource {
    None,
    Static(String),
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        http_client: reqwest::Client,
        cached: Mutex<Option<CachedToken>>,
        clock: Arc<dyn Clock>,
    },
}

/// Bearer credential for the generation provider.
///
/// Cloning shares the cached token. Concurrent callers that find the token
/// stale wait on the same refresh instead of each hitting the token endpoint.
#[derive(Clone)]
pub struct CredentialCache {
    source: Arc<CredentialSource>,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.source.as_ref() {
            CredentialSource::None => "none",
            CredentialSource::Static(_) => "static",
            CredentialSource::ClientCredentials { .. } => "client_credentials",
        };
        f.debug_struct("CredentialCache").field("source", &kind).finish()
    }
}

impl CredentialCache {
    pub fn none() -> Self {
        Self {
            source: Arc::new(CredentialSource::None),
        }
    }

    pub fn from_static(api_key: impl Into<String>) -> Self {
        Self {
            source: Arc::new(CredentialSource::Static(api_key.into())),
        }
    }

    pub fn client_credentials(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AlmanacError::Llm(format!("Failed to create token HTTP client: {e}")))?;

        Ok(Self {
            source: Arc::new(CredentialSource::ClientCredentials {
                token_url: token_url.into(),
                client_id: client_id.into(),
                client_secret: client_secret.into(),
                http_client,
                cached: Mutex::new(None),
                clock,
            }),
        })
    }

    /// Picks the token endpoint when it is fully configured, else the static key.
    pub fn from_config(config: &LlmConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        match (&config.token_url, &config.client_id, &config.client_secret) {
            (Some(token_url), Some(client_id), Some(client_secret)) => Self::client_credentials(
                token_url.clone(),
                client_id.clone(),
                client_secret.clone(),
                config.timeout_secs,
                clock,
            ),
            (Some(_), _, _) => Err(AlmanacError::Llm(
                "LLM_TOKEN_URL requires LLM_CLIENT_ID and LLM_CLIENT_SECRET".to_string(),
            )),
            _ => Ok(match &config.api_key {
                Some(key) => Self::from_static(key.clone()),
                None => Self::none(),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.source.as_ref(), CredentialSource::None)
    }

    /// Current bearer token, or `None` when no credential is configured.
    pub async fn bearer(&self) -> Result<Option<String>> {
        match self.source.as_ref() {
            CredentialSource::None => Ok(None),
            CredentialSource::Static(key) => Ok(Some(key.clone())),
            CredentialSource::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                http_client,
                cached,
                clock,
            } => {
                let mut guard = cached.lock().await;
                let now = clock.now();

                if let Some(token) = guard.as_ref() {
                    if token.expires_at > now {
                        return Ok(Some(token.access_token.clone()));
                    }
                }

                tracing::debug!(token_url = %token_url, "Refreshing LLM access token");
                let token = fetch_token(http_client, token_url, client_id, client_secret).await?;
                let lifetime = token.expires_in.unwrap_or(3600).max(0);
                let cached_token = CachedToken {
                    access_token: token.access_token,
                    expires_at: now + chrono::Duration::seconds(lifetime - REFRESH_MARGIN_SECS),
                };
                let access_token = cached_token.access_token.clone();
                *guard = Some(cached_token);

                Ok(Some(access_token))
            }
        }
    }

    /// Forget a cached token, e.g. after the provider rejected it.
    pub async fn invalidate(&self) {
        if let CredentialSource::ClientCredentials { cached, .. } = self.source.as_ref() {
            *cached.lock().await = None;
        }
    }
}

async fn fetch_token(
    http_client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenResponse> {
    let response = http_client
        .post(token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .send()
        .await
        .map_err(|e| AlmanacError::Llm(format!("Token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AlmanacError::Llm(format!(
            "Token endpoint returned {status}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AlmanacError::Llm(format!("Invalid token response: {e}")))?;

    if token.access_token.trim().is_empty() {
        return Err(AlmanacError::Llm("Token endpoint returned an empty token".to_string()));
    }

    Ok(token)
}
