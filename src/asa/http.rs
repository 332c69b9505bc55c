//! HTTP transport for ASA REST API calls
//!
//! The transport only moves bytes. It reports the status code and the raw
//! body and leaves the interpretation of both to the resource handlers,
//! which each accept a different set of statuses.

use std::future::Future;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AsaError, Result};

/// Public ASA endpoint used when no base URL is configured
pub const DEFAULT_API_URL: &str = "https://app.scaleft.com/v1";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
pub fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Status code and raw body of a completed round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| AsaError::decode(context, e))
    }
}

/// Sends a single request to the ASA API
///
/// `path` is absolute from the API root (`/teams/{team}/...`). Implementations
/// must return `Ok` for every status code and `Err` only when the round trip
/// itself fails.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        token: Option<&str>,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> impl Future<Output = Result<ApiResponse>> + Send;
}

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct AsaHttpClient {
    client: Client,
    base_url: Url,
}

impl AsaHttpClient {
    /// Create a client for the public ASA endpoint
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// Create a client for a custom endpoint (self-hosted or test server)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AsaError::Validation(format!("invalid API URL {base_url}: {e}")))?;

        let client = Client::builder()
            .user_agent(concat!("asa-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for an API path
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Transport for AsaHttpClient {
    async fn send(
        &self,
        token: Option<&str>,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse> {
        let url = self.url_for(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json");

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status >= 400 {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::debug!("API returned {} - {}", status, sanitize_for_log(&body));
        }

        Ok(ApiResponse { status, body })
    }
}

/// Format an ASA error for display
/// Security: Sanitizes error messages to avoid leaking API details
pub fn format_asa_error(error: &AsaError) -> String {
    match error {
        AsaError::Validation(msg) => msg.clone(),
        AsaError::NotFound(what) => format!("{what} not found."),
        AsaError::Auth(_) => {
            "Authentication failed. Check OKTAASA_KEY and OKTAASA_KEY_SECRET.".to_string()
        }
        AsaError::Transport(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        AsaError::Decode { context, .. } => format!("Unexpected response while reading {context}."),
        AsaError::Remote { action, status, .. } => match status {
            401 => "Authentication failed. The bearer token was rejected.".to_string(),
            403 => "Permission denied. Check the service user's team role.".to_string(),
            404 => "Resource not found.".to_string(),
            409 => "Resource conflict. The resource may already exist.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            500..=599 => "ASA service temporarily unavailable. Please try again.".to_string(),
            _ => format!("{action} failed with status {status}."),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let client = AsaHttpClient::with_base_url("https://app.scaleft.com/v1/").unwrap();
        assert_eq!(
            client.url_for("/teams/acme/projects"),
            "https://app.scaleft.com/v1/teams/acme/projects"
        );
    }

    #[test]
    fn test_invalid_base_url_is_validation_error() {
        let err = AsaHttpClient::with_base_url("not a url").err().unwrap();
        assert!(matches!(err, AsaError::Validation(_)));
    }

    #[test]
    fn test_format_remote_errors() {
        let err = AsaError::remote("read project", 403, "{}");
        assert_eq!(
            format_asa_error(&err),
            "Permission denied. Check the service user's team role."
        );
        let err = AsaError::remote("create project", 418, "");
        assert_eq!(format_asa_error(&err), "create project failed with status 418.");
    }
}
