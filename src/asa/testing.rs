//! In-memory transport for handler unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use reqwest::Method;

use super::auth::AsaCredentials;
use super::client::AsaClient;
use super::http::{ApiResponse, Transport};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub token: Option<String>,
    pub method: Method,
    pub path: String,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    pub fn json_body(&self) -> serde_json::Value {
        let body = self.body.as_deref().unwrap_or(b"null");
        serde_json::from_slice(body).expect("request body should be JSON")
    }
}

/// Replays queued responses in order and records every request
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<ApiResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(ApiResponse::new(status, body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    async fn send(
        &self,
        token: Option<&str>,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            token: token.map(str::to_string),
            method: method.clone(),
            path: path.to_string(),
            body,
        });

        let response = self.responses.lock().unwrap().pop_front();
        Ok(response.unwrap_or_else(|| panic!("no response queued for {method} {path}")))
    }
}

/// Client for team `acme` with a static token over a fresh fake transport
pub fn fake_client() -> AsaClient<FakeTransport> {
    AsaClient::with_transport("acme", AsaCredentials::from_token("test-token"), FakeTransport::new())
}
