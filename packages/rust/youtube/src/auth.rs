//! Access-token providers.
//!
//! The client asks a [`TokenProvider`] for a bearer token before every
//! request. Refresh logic lives behind the trait so callers never see it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use tubekeeper_shared::{AuthConfig, Result, TubekeeperError};

/// Tokens are refreshed this long before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies a valid OAuth2 access token on demand.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

// ---------------------------------------------------------------------------
// StaticToken
// ---------------------------------------------------------------------------

/// A fixed, externally managed access token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// RefreshTokenProvider
// ---------------------------------------------------------------------------

/// Exchanges a long-lived refresh token for short-lived access tokens.
pub struct RefreshTokenProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl RefreshTokenProvider {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            cached: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Result<TokenResponse> {
        debug!(token_url = %self.token_url, "refreshing access token");
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TubekeeperError::Auth(format!("token refresh failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TubekeeperError::Auth(format!(
                "token refresh rejected: HTTP {status}: {}",
                body.trim()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| TubekeeperError::Auth(format!("invalid token response: {e}")))
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.refresh().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = fresh.expires_in, "obtained access token");

        let access_token = fresh.access_token.clone();
        *cached = Some(CachedToken {
            access_token: fresh.access_token,
            refresh_at: Instant::now() + lifetime,
        });
        Ok(access_token)
    }
}

// ---------------------------------------------------------------------------
// Construction from config
// ---------------------------------------------------------------------------

/// Pick a provider from the env vars named in `[auth]`.
///
/// A ready-made access token wins; otherwise all three refresh-grant
/// variables must be set.
pub fn provider_from_config(config: &AuthConfig, client: Client) -> Result<Arc<dyn TokenProvider>> {
    if let Some(token) = read_env(&config.access_token_env) {
        debug!(var = %config.access_token_env, "using static access token");
        return Ok(Arc::new(StaticToken::new(token)));
    }

    let require = |name: &str| {
        read_env(name).ok_or_else(|| {
            TubekeeperError::config(format!(
                "environment variable {name} is not set (or set {} instead)",
                config.access_token_env
            ))
        })
    };

    Ok(Arc::new(RefreshTokenProvider::new(
        client,
        &config.token_url,
        require(&config.client_id_env)?,
        require(&config.client_secret_env)?,
        require(&config.refresh_token_env)?,
    )))
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
