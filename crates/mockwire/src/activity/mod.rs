//! Activity feed of served requests.
//!
//! The dispatcher reports every exchange to an [`ActivitySink`]. Sinks are
//! shared as `Arc<dyn ActivitySink>`; [`TracingSink`] logs entries and
//! [`ActivityLog`] keeps the most recent ones in memory for export.

mod log;

pub use log::{ActivityLog, ExportedMock};

use crate::mock::ServiceType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// One request as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    /// `None` when the request could not be classified
    pub service_type: Option<ServiceType>,
    pub method: String,
    pub url: String,
    pub request_body: String,
    /// `None` when the response was withheld
    pub status: Option<u16>,
    pub response_body: String,
    pub elapsed_ms: u64,
    /// Description (or url) of the mock that answered
    pub matched: Option<String>,
    pub error: Option<String>,
}

impl ActivityEntry {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            service_type: None,
            method: method.into(),
            url: url.into(),
            request_body: String::new(),
            status: None,
            response_body: String::new(),
            elapsed_ms: 0,
            matched: None,
            error: None,
        }
    }
}

/// Receiver of activity entries.
pub trait ActivitySink: Send + Sync {
    fn record(&self, entry: &ActivityEntry);
}

/// Logs each entry as a structured tracing event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn record(&self, entry: &ActivityEntry) {
        let service_type = entry
            .service_type
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        match &entry.error {
            Some(error) => warn!(
                service_type = %service_type,
                method = %entry.method,
                url = %entry.url,
                status = ?entry.status,
                elapsed_ms = entry.elapsed_ms,
                "Request failed: {}",
                error
            ),
            None => info!(
                service_type = %service_type,
                method = %entry.method,
                url = %entry.url,
                status = ?entry.status,
                elapsed_ms = entry.elapsed_ms,
                matched = entry.matched.as_deref().unwrap_or("-"),
                "Request served"
            ),
        }
    }
}

/// Forwards every entry to several sinks in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ActivitySink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ActivitySink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ActivitySink for FanoutSink {
    fn record(&self, entry: &ActivityEntry) {
        for sink in &self.sinks {
            sink.record(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(ActivityLog::new(10));
        let second = Arc::new(ActivityLog::new(10));
        let fanout = FanoutSink::default()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingSink));

        fanout.record(&ActivityEntry::new("/a", "GET"));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_tracing_sink_logs_errors() {
        let mut entry = ActivityEntry::new("/a", "POST");
        entry.error = Some("Unsupported content type: text/plain".to_string());
        TracingSink.record(&entry);
        assert!(logs_contain("Request failed"));
        assert!(logs_contain("text/plain"));
    }
}
