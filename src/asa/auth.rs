//! ASA Authentication
//!
//! Handles bearer token acquisition. A token is either supplied directly or
//! obtained by exchanging a service user's API key for a short-lived
//! session token.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::client::path_segment;
use super::http::{sanitize_for_log, Transport};
use crate::error::{AsaError, Result};

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if the API does not report an expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Serialize)]
struct ServiceTokenRequest<'a> {
    key_id: &'a str,
    key_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServiceTokenResponse {
    bearer_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

enum TokenSource {
    Static(String),
    ServiceUser { key_id: String, key_secret: String },
}

/// ASA credentials holder with token caching
#[derive(Clone)]
pub struct AsaCredentials {
    source: Arc<TokenSource>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl fmt::Debug for AsaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source.as_ref() {
            TokenSource::Static(_) => "static",
            TokenSource::ServiceUser { .. } => "service_user",
        };
        f.debug_struct("AsaCredentials").field("source", &kind).finish()
    }
}

impl AsaCredentials {
    /// Use a pre-issued bearer token as is
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::with_source(TokenSource::Static(token.into()))
    }

    /// Exchange a service user's key id and secret for session tokens
    pub fn service_user(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self::with_source(TokenSource::ServiceUser {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    fn with_source(source: TokenSource) -> Self {
        Self {
            source: Arc::new(source),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get a bearer token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token<T: Transport>(&self, transport: &T, team: &str) -> Result<String> {
        let (key_id, key_secret) = match self.source.as_ref() {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceUser { key_id, key_secret } => (key_id, key_secret),
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let request = ServiceTokenRequest { key_id, key_secret };
        let body = serde_json::to_vec(&request)
            .map_err(|e| AsaError::decode("service token request", e))?;
        let path = format!("/teams/{}/service_token", path_segment(team));

        let response = transport.send(None, Method::POST, &path, Some(body)).await?;
        if !response.is_success() {
            tracing::error!(
                "Service token request failed: {} - {}",
                response.status,
                sanitize_for_log(&response.body)
            );
            return Err(AsaError::Auth(format!(
                "service token request for team {team} returned status {}",
                response.status
            )));
        }

        let issued: ServiceTokenResponse = response.json("service token response")?;
        let ttl = issued
            .expires_at
            .and_then(|at| (at - Utc::now()).to_std().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: issued.bearer_token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(issued.bearer_token)
    }

    /// Force refresh the token
    pub async fn refresh_token<T: Transport>(&self, transport: &T, team: &str) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token(transport, team).await
    }
}
