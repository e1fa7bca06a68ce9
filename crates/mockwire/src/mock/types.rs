//! Type definitions for recorded mocks.
//!
//! A [`MockNode`] is one recorded request/response pair; a [`MockFileNode`]
//! owns the ordered mocks loaded from a single source file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of service a mock simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServiceType {
    #[default]
    #[serde(rename = "REST", alias = "rest", alias = "Rest")]
    Rest,
    #[serde(rename = "SOAP", alias = "soap", alias = "Soap")]
    Soap,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Rest => f.write_str("REST"),
            ServiceType::Soap => f.write_str("SOAP"),
        }
    }
}

/// Operator-set fault forcing a specific failure instead of the recorded response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultTag {
    NotFound,
    InternalServerError,
    /// No response is sent until the service timeout elapses.
    TimeOut,
}

impl FaultTag {
    /// Every fault kind an operator can pick from.
    pub const ALL: [FaultTag; 3] = [
        FaultTag::NotFound,
        FaultTag::InternalServerError,
        FaultTag::TimeOut,
    ];

    /// Status code answered immediately, or `None` when the response is withheld.
    pub fn status_code(self) -> Option<u16> {
        match self {
            FaultTag::NotFound => Some(404),
            FaultTag::InternalServerError => Some(500),
            FaultTag::TimeOut => None,
        }
    }
}

impl fmt::Display for FaultTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultTag::NotFound => f.write_str("NotFound"),
            FaultTag::InternalServerError => f.write_str("InternalServerError"),
            FaultTag::TimeOut => f.write_str("TimeOut"),
        }
    }
}

// ============================================================================
// Mock Types
// ============================================================================

/// Recorded request side of a mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Recorded response side of a mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    /// Defaults to 200 when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub body: String,
    /// Delay before answering, in seconds
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delay: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl MockResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            body: body.into(),
            delay: 0,
        }
    }

    pub fn status(&self) -> u16 {
        self.status_code.unwrap_or(200)
    }
}

/// One recorded request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockNode {
    /// Path plus optional query string; may contain `(*)` wildcards
    pub url: String,
    /// HTTP verb for REST, action name for SOAP
    pub method_name: String,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub request: MockRequest,
    /// A mock without a response simulates an unresponsive dependency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<MockResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulate_exception: Option<FaultTag>,
}

impl MockNode {
    pub fn new(
        service_type: ServiceType,
        url: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            method_name: method.into(),
            service_type,
            description: None,
            request: MockRequest::default(),
            response: Some(MockResponse::default()),
            simulate_exception: None,
        }
    }

    pub fn rest(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(ServiceType::Rest, url, method)
    }

    pub fn soap(url: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(ServiceType::Soap, url, action)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    pub fn with_response(mut self, status_code: u16, body: impl Into<String>) -> Self {
        self.response = Some(MockResponse::new(status_code, body));
        self
    }

    pub fn with_delay(mut self, seconds: u64) -> Self {
        self.response.get_or_insert_with(MockResponse::default).delay = seconds;
        self
    }

    pub fn without_response(mut self) -> Self {
        self.response = None;
        self
    }

    pub fn with_fault(mut self, fault: FaultTag) -> Self {
        self.simulate_exception = Some(fault);
        self
    }

    pub fn request_body(&self) -> Option<&str> {
        self.request.body.as_deref()
    }

    /// Short label used in logs.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.url)
    }
}

// ============================================================================
// Mock File
// ============================================================================

/// The ordered mocks loaded from one source file.
///
/// Nodes are shared with the match repository as `Arc`s; edits replace the
/// node rather than mutating it, so a lookup in flight keeps the version it
/// matched.
#[derive(Debug, Clone)]
pub struct MockFileNode {
    path: PathBuf,
    nodes: Vec<Arc<MockNode>>,
    dirty: bool,
}

impl MockFileNode {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            nodes: Vec::new(),
            dirty: false,
        }
    }

    pub fn with_nodes(path: impl Into<PathBuf>, nodes: impl IntoIterator<Item = MockNode>) -> Self {
        Self {
            path: path.into(),
            nodes: nodes.into_iter().map(Arc::new).collect(),
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn nodes(&self) -> &[Arc<MockNode>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn get(&self, index: usize) -> Option<&Arc<MockNode>> {
        self.nodes.get(index)
    }

    /// Append a mock, returning its index.
    pub fn push(&mut self, node: MockNode) -> usize {
        self.nodes.push(Arc::new(node));
        self.dirty = true;
        self.nodes.len() - 1
    }

    pub fn replace(&mut self, index: usize, node: MockNode) -> Option<Arc<MockNode>> {
        let slot = self.nodes.get_mut(index)?;
        let previous = std::mem::replace(slot, Arc::new(node));
        self.dirty = true;
        Some(previous)
    }

    pub fn remove(&mut self, index: usize) -> Option<Arc<MockNode>> {
        if index >= self.nodes.len() {
            return None;
        }
        self.dirty = true;
        Some(self.nodes.remove(index))
    }

    pub fn set_fault(&mut self, index: usize, fault: Option<FaultTag>) -> bool {
        let Some(current) = self.nodes.get(index) else {
            return false;
        };
        let mut updated = MockNode::clone(current);
        updated.simulate_exception = fault;
        self.nodes[index] = Arc::new(updated);
        self.dirty = true;
        true
    }

    /// Owned copies of the mocks, in file order.
    pub fn to_mocks(&self) -> Vec<MockNode> {
        self.nodes.iter().map(|n| MockNode::clone(n)).collect()
    }
}
