//! ASA Client
//!
//! Carries the team, credentials and transport every resource handler
//! needs. All paths passed to the request helpers are relative to the
//! team prefix `/teams/{team}`.

use std::borrow::Cow;

use reqwest::Method;
use serde::Serialize;

use super::auth::AsaCredentials;
use super::http::{ApiResponse, AsaHttpClient, Transport};
use crate::error::{AsaError, Result};

/// Percent-encode a value used as a single URL path segment
pub fn path_segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Main ASA client
#[derive(Clone, Debug)]
pub struct AsaClient<T = AsaHttpClient> {
    pub credentials: AsaCredentials,
    pub transport: T,
    team: String,
}

impl AsaClient<AsaHttpClient> {
    /// Create a client against the given API base URL
    pub fn new(team: &str, credentials: AsaCredentials, api_url: &str) -> Result<Self> {
        let transport = AsaHttpClient::with_base_url(api_url)?;
        Ok(Self::with_transport(team, credentials, transport))
    }
}

impl<T: Transport> AsaClient<T> {
    pub fn with_transport(team: &str, credentials: AsaCredentials, transport: T) -> Self {
        Self {
            credentials,
            transport,
            team: team.to_string(),
        }
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    /// Get the current bearer token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token(&self.transport, &self.team).await
    }

    /// Build the absolute API path for a team-relative path
    pub fn team_path(&self, path: &str) -> String {
        format!("/teams/{}{}", path_segment(&self.team), path)
    }

    async fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<ApiResponse> {
        let token = self.get_token().await?;
        let path = self.team_path(path);
        self.transport.send(Some(&token), method, &path, body).await
    }

    /// Make a GET request to a team-relative path
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::GET, path, None).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let body = encode_body(path, body)?;
        self.send(Method::POST, path, Some(body)).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let body = encode_body(path, body)?;
        self.send(Method::PUT, path, Some(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::DELETE, path, None).await
    }
}

fn encode_body<B: Serialize>(path: &str, body: &B) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(body).map_err(|e| AsaError::decode(format!("body for {path}"), e))?;
    tracing::debug!("Request body for {}: {}", path, String::from_utf8_lossy(&body));
    Ok(body)
}
