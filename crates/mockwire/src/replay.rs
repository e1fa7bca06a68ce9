//! Replays recorded mocks against a running server.
//!
//! Useful as a smoke test: every mock should be answered by the server that
//! loaded it.

use crate::matching::WILDCARD;
use crate::mock::{MockFileNode, MockNode, ServiceType};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder sent for `(*)` path segments and query values.
const WILDCARD_SAMPLE: &str = "any";

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Invalid HTTP method '{0}'")]
    Method(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Result of replaying one mock.
#[derive(Debug)]
pub struct ReplayOutcome {
    pub url: String,
    pub method: String,
    pub service_type: ServiceType,
    /// Status code and body, or why the request failed
    pub result: Result<(u16, String), ReplayError>,
}

impl ReplayOutcome {
    /// The server answered with the status the mock records.
    pub fn matches(&self, mock: &MockNode) -> bool {
        let expected = match (mock.simulate_exception, &mock.response) {
            (Some(fault), _) => fault.status_code(),
            (None, Some(response)) => Some(response.status()),
            (None, None) => None,
        };
        match (&self.result, expected) {
            (Ok((status, _)), Some(expected)) => *status == expected,
            _ => false,
        }
    }
}

pub struct Replayer {
    client: Client,
    base_url: String,
}

impl Replayer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ReplayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ReplayError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Replay every mock of `files`, in file order.
    pub async fn replay(&self, files: &[MockFileNode]) -> Vec<ReplayOutcome> {
        let mut outcomes = Vec::new();
        for mock in files.iter().flat_map(|file| file.nodes()) {
            outcomes.push(self.replay_mock(mock).await);
        }
        outcomes
    }

    pub async fn replay_mock(&self, mock: &MockNode) -> ReplayOutcome {
        let url = concrete_url(&mock.url);
        let result = self.send(mock, &url).await;
        if let Err(e) = &result {
            warn!("Replay of {} {} failed: {}", mock.method_name, url, e);
        }
        ReplayOutcome {
            url,
            method: mock.method_name.clone(),
            service_type: mock.service_type,
            result,
        }
    }

    async fn send(&self, mock: &MockNode, url: &str) -> Result<(u16, String), ReplayError> {
        let target = format!("{}{}", self.base_url, url);
        let body = mock.request_body().unwrap_or("").to_string();
        let request = match mock.service_type {
            ServiceType::Rest => {
                let method = Method::from_bytes(mock.method_name.to_uppercase().as_bytes())
                    .map_err(|_| ReplayError::Method(mock.method_name.clone()))?;
                let request = self.client.request(method.clone(), &target);
                if method == Method::GET {
                    request
                } else {
                    request
                        .header(CONTENT_TYPE, "application/json")
                        .body(body)
                }
            }
            ServiceType::Soap => self
                .client
                .post(&target)
                .header(CONTENT_TYPE, "text/xml; charset=utf-8")
                .body(body),
        };

        debug!("Replaying {} {}", mock.method_name, target);
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

/// Substitute a sample value for every wildcard in a mock URL.
fn concrete_url(url: &str) -> String {
    let url = url.replace(WILDCARD, WILDCARD_SAMPLE);
    if url.starts_with('/') {
        url
    } else {
        format!("/{url}")
    }
}
