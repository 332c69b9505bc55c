//! Error types shared by the ASA client and the resource handlers

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = AsaError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AsaError {
    /// Local validation failed, no request was sent
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// The request never completed a round trip
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a status outside the accepted set
    #[error("{action} failed with status {status}: {body}")]
    Remote {
        action: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    NotFound(String),

    /// Service token exchange was rejected
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl AsaError {
    pub fn remote(action: impl Into<String>, status: u16, body: &str) -> Self {
        Self::Remote {
            action: action.into(),
            status,
            body: crate::asa::http::sanitize_for_log(body),
        }
    }

    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// HTTP status carried by a remote rejection, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
