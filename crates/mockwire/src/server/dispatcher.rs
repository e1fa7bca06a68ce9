//! Per-request handling: classify, look up the mock, answer.

use super::classify::classify;
use super::response::{build_response, empty_response, EchoHeaders};
use super::DispatchError;
use crate::activity::{ActivityEntry, ActivitySink};
use crate::config::Config;
use crate::matching::MatchRepository;
use crate::mock::{MockNode, ServiceType};
use bytes::Bytes;
use futures::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Dispatcher settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub service_timeout: Duration,
    pub correlation_header: HeaderName,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            service_timeout: Duration::from_secs(100),
            correlation_header: HeaderName::from_static("x-correlation-id"),
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let correlation_header = HeaderName::from_bytes(config.correlation_header.as_bytes())
            .map_err(|e| {
                anyhow::anyhow!(
                    "Invalid correlation header '{}': {}",
                    config.correlation_header,
                    e
                )
            })?;
        Ok(Self {
            service_timeout: config.service_timeout(),
            correlation_header,
        })
    }
}

/// The parts of an HTTP request the dispatcher looks at.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path and query as received
    pub url: String,
    pub content_type: Option<HeaderValue>,
    pub correlation_id: Option<HeaderValue>,
    pub body: String,
}

impl InboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            content_type: None,
            correlation_id: None,
            body: String::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(HeaderValue::from_static(content_type));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Read the request fully. The body of a GET request is discarded.
    pub async fn read(req: Request<Incoming>, correlation_header: &HeaderName) -> Self {
        let (parts, body) = req.into_parts();
        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let body = if parts.method == Method::GET {
            String::new()
        } else {
            match body.collect().await {
                Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
                Err(e) => {
                    debug!("Failed to read request body for {}: {}", url, e);
                    String::new()
                }
            }
        };

        Self {
            content_type: parts.headers.get(CONTENT_TYPE).cloned(),
            correlation_id: parts.headers.get(correlation_header).cloned(),
            method: parts.method,
            url,
            body,
        }
    }

    fn content_type_str(&self) -> Option<&str> {
        self.content_type.as_ref().and_then(|v| v.to_str().ok())
    }
}

/// What the dispatcher decided to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Respond {
        status: u16,
        body: String,
        delay: Duration,
    },
    /// Hold the connection until the service timeout, then drop it
    Withhold,
}

impl Reply {
    fn status(status: u16) -> Self {
        Reply::Respond {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }
}

/// Answers requests from the mocks of a [`MatchRepository`].
pub struct RequestDispatcher {
    repository: Arc<MatchRepository>,
    sink: Arc<dyn ActivitySink>,
    settings: DispatchSettings,
}

impl RequestDispatcher {
    pub fn new(
        repository: Arc<MatchRepository>,
        sink: Arc<dyn ActivitySink>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            repository,
            sink,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Hyper entry point. A panic while handling the request answers 500.
    pub async fn serve(
        self: Arc<Self>,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, DispatchError> {
        let request = InboundRequest::read(req, &self.settings.correlation_header).await;
        let url = request.url.clone();
        match AssertUnwindSafe(self.handle(request)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Panic while handling request for {}", url);
                Ok(empty_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }

    /// Answer one request.
    ///
    /// Returns [`DispatchError::Withheld`] after sleeping the service timeout
    /// when the matched mock simulates an unresponsive service.
    pub async fn handle(
        &self,
        request: InboundRequest,
    ) -> Result<Response<Full<Bytes>>, DispatchError> {
        let started = Instant::now();
        let mut entry = ActivityEntry::new(request.url.clone(), request.method.as_str());
        entry.request_body = request.body.clone();

        let reply = self.decide(&request, &mut entry);

        match reply {
            Reply::Withhold => {
                self.sink.record(&entry);
                tokio::time::sleep(self.settings.service_timeout).await;
                debug!("Dropping withheld request for {}", request.url);
                Err(DispatchError::Withheld)
            }
            Reply::Respond {
                status,
                body,
                delay,
            } => {
                if !delay.is_zero() {
                    debug!("Delaying response for {} by {:?}", request.url, delay);
                    tokio::time::sleep(delay).await;
                }
                let response = self.build(&request, status, &body);
                entry.status = Some(response.status().as_u16());
                entry.response_body = body;
                entry.elapsed_ms = started.elapsed().as_millis() as u64;
                self.sink.record(&entry);
                Ok(response)
            }
        }
    }

    fn decide(&self, request: &InboundRequest, entry: &mut ActivityEntry) -> Reply {
        let classification =
            match classify(&request.method, request.content_type_str(), &request.body) {
                Ok(c) => c,
                Err(e @ DispatchError::Classification(_)) => {
                    error!("{} for {} {}", e, request.method, request.url);
                    entry.error = Some(e.to_string());
                    return Reply::status(404);
                }
                Err(e) => {
                    warn!("{} for {}", e, request.url);
                    entry.error = Some(e.to_string());
                    return Reply::status(500);
                }
            };
        entry.service_type = Some(classification.service_type);
        entry.method = classification.method.clone();

        let found = self.repository.get_mock(
            classification.service_type,
            &request.url,
            &classification.method,
            &request.body,
        );
        match found {
            Ok(Some(mock)) => {
                entry.matched = Some(mock.label().to_string());
                reply_for(&mock, classification.service_type)
            }
            Ok(None) => {
                debug!(
                    "No mock for {} {} {}",
                    classification.service_type, classification.method, request.url
                );
                Reply::status(404)
            }
            Err(e) => {
                warn!("Matching failed for {}: {}", request.url, e);
                entry.error = Some(DispatchError::Match(e).to_string());
                Reply::status(500)
            }
        }
    }

    fn build(&self, request: &InboundRequest, status: u16, body: &str) -> Response<Full<Bytes>> {
        let echo = EchoHeaders {
            content_type: request.content_type.clone(),
            correlation: request
                .correlation_id
                .clone()
                .map(|value| (self.settings.correlation_header.clone(), value)),
        };
        let response = match StatusCode::from_u16(status) {
            Ok(status) => build_response(status, body.to_string()),
            Err(_) => {
                warn!("Mock for {} has invalid status code {}", request.url, status);
                empty_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
        echo.apply(response)
    }
}

fn reply_for(mock: &MockNode, service_type: ServiceType) -> Reply {
    if let Some(fault) = mock.simulate_exception {
        warn!("Simulating {} for {} mock {}", fault, service_type, mock.label());
        return match fault.status_code() {
            Some(status) => Reply::status(status),
            None => Reply::Withhold,
        };
    }
    match &mock.response {
        Some(response) => Reply::Respond {
            status: response.status(),
            body: response.body.clone(),
            delay: Duration::from_secs(response.delay),
        },
        None => Reply::Withhold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityLog;
    use crate::mock::{FaultTag, MockFileNode};
    use tracing_test::traced_test;

    fn dispatcher(mocks: Vec<MockNode>) -> (RequestDispatcher, Arc<ActivityLog>) {
        let repository = Arc::new(MatchRepository::default());
        repository.build_repository(&[MockFileNode::with_nodes("m.json", mocks)]);
        let log = Arc::new(ActivityLog::new(100));
        let settings = DispatchSettings {
            service_timeout: Duration::from_millis(50),
            ..DispatchSettings::default()
        };
        (RequestDispatcher::new(repository, log.clone(), settings), log)
    }

    async fn body_of(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_recorded_response() {
        let (dispatcher, log) = dispatcher(vec![MockNode::rest("/api/test", "GET")
            .with_description("A")
            .with_response(201, r#"{"ok":true}"#)]);

        let mut request = InboundRequest::new(Method::GET, "/api/test?x=1")
            .with_content_type("application/json");
        request.correlation_id = Some(HeaderValue::from_static("corr-1"));

        let response = dispatcher.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["x-correlation-id"], "corr-1");
        assert_eq!(body_of(response).await, r#"{"ok":true}"#);

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, Some(201));
        assert_eq!(entries[0].matched.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_no_mock_is_404() {
        let (dispatcher, _) = dispatcher(vec![]);
        let response = dispatcher
            .handle(InboundRequest::new(Method::GET, "/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "");
    }

    #[tokio::test]
    async fn test_fault_tags() {
        let (dispatcher, _) = dispatcher(vec![
            MockNode::rest("/nf", "GET").with_fault(FaultTag::NotFound),
            MockNode::rest("/ise", "GET").with_fault(FaultTag::InternalServerError),
            MockNode::rest("/slow", "GET").with_fault(FaultTag::TimeOut),
        ]);
        let status = |r: Response<Full<Bytes>>| r.status();

        let nf = dispatcher.handle(InboundRequest::new(Method::GET, "/nf")).await;
        assert_eq!(status(nf.unwrap()), StatusCode::NOT_FOUND);
        let ise = dispatcher.handle(InboundRequest::new(Method::GET, "/ise")).await;
        assert_eq!(status(ise.unwrap()), StatusCode::INTERNAL_SERVER_ERROR);

        let started = Instant::now();
        let slow = dispatcher.handle(InboundRequest::new(Method::GET, "/slow")).await;
        assert!(matches!(slow, Err(DispatchError::Withheld)));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_mock_without_response_is_withheld() {
        let (dispatcher, log) = dispatcher(vec![MockNode::rest("/void", "GET").without_response()]);
        let result = dispatcher
            .handle(InboundRequest::new(Method::GET, "/void"))
            .await;
        assert!(matches!(result, Err(DispatchError::Withheld)));
        assert_eq!(log.entries()[0].status, None);
    }

    #[tokio::test]
    async fn test_response_without_body_answers_empty() {
        let mock: MockNode = serde_json::from_str(
            r#"{"url": "/empty", "methodName": "GET", "response": {"statusCode": 200}}"#,
        )
        .unwrap();
        let (dispatcher, _) = dispatcher(vec![mock]);
        let response = dispatcher
            .handle(InboundRequest::new(Method::GET, "/empty"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "");
    }

    #[tokio::test]
    async fn test_invalid_status_code_is_500() {
        let (dispatcher, _) =
            dispatcher(vec![MockNode::rest("/bad", "GET").with_response(1000, "x")]);
        let response = dispatcher
            .handle(InboundRequest::new(Method::GET, "/bad"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_soap_envelope_is_500() {
        let (dispatcher, log) = dispatcher(vec![]);
        let request = InboundRequest::new(Method::POST, "/ws")
            .with_content_type("text/xml")
            .with_body("<broken");
        let response = dispatcher.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(log.entries()[0].error.is_some());
    }

    #[tokio::test]
    async fn test_soap_request_dispatch() {
        let envelope = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><GetQuoteRequest><Symbol>ACME</Symbol></GetQuoteRequest></s:Body></s:Envelope>"#;
        let (dispatcher, _) = dispatcher(vec![MockNode::soap("/ws/quotes", "GetQuote")
            .with_request_body(envelope)
            .with_response(200, "<Quote>42</Quote>")]);
        let request = InboundRequest::new(Method::POST, "/ws/quotes")
            .with_content_type("text/xml; charset=utf-8")
            .with_body(envelope);
        let response = dispatcher.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/xml; charset=utf-8");
        assert_eq!(body_of(response).await, "<Quote>42</Quote>");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unknown_content_type_is_logged_and_404() {
        let (dispatcher, log) = dispatcher(vec![MockNode::rest("/api", "POST")]);
        let request = InboundRequest::new(Method::POST, "/api")
            .with_content_type("text/plain")
            .with_body("hello");
        let response = dispatcher.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(logs_contain("Unsupported content type: text/plain"));
        assert_eq!(log.entries()[0].service_type, None);
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            correlation_header: "X-Trace-Id".to_string(),
            service_timeout_secs: 7,
            ..Config::default()
        };
        let settings = DispatchSettings::from_config(&config).unwrap();
        assert_eq!(settings.correlation_header, "x-trace-id");
        assert_eq!(settings.service_timeout, Duration::from_secs(7));
    }
}
