//! Bounded in-memory activity log.

use super::{ActivityEntry, ActivitySink};
use crate::matching::MatchRepository;
use crate::mock::{save_mock_file, MockFileError, MockFileNode, MockNode, MockResponse};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use tracing::info;

/// A recorded exchange converted back into a mock.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedMock {
    pub mock: MockNode,
    /// No loaded mock exists yet for this url and method
    pub is_new: bool,
}

/// Keeps the most recent entries, dropping the oldest beyond `capacity`.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Turn recorded traffic into mocks.
    ///
    /// Requests that were never classified are skipped. A withheld response
    /// exports as a mock without response.
    pub fn export(&self, repository: &MatchRepository) -> Vec<ExportedMock> {
        self.entries()
            .into_iter()
            .filter_map(|entry| {
                let service_type = entry.service_type?;
                let mut mock = MockNode::new(service_type, entry.url, entry.method);
                if !entry.request_body.is_empty() {
                    mock.request.body = Some(entry.request_body);
                }
                mock.response = entry
                    .status
                    .map(|status| MockResponse::new(status, entry.response_body));
                let is_new = !repository.is_mock_exists(&mock.url, &mock.method_name);
                Some(ExportedMock { mock, is_new })
            })
            .collect()
    }

    /// Write the exported mocks that no loaded mock covers to `path`, one per
    /// url and method, in the format its extension names.
    ///
    /// Returns the number of mocks written. Nothing is written when there are
    /// none.
    pub fn save_new_mocks(
        &self,
        repository: &MatchRepository,
        path: &Path,
    ) -> Result<usize, MockFileError> {
        let mut seen = HashSet::new();
        let mocks: Vec<MockNode> = self
            .export(repository)
            .into_iter()
            .filter(|exported| exported.is_new)
            .map(|exported| exported.mock)
            .filter(|mock| {
                seen.insert((mock.url.to_lowercase(), mock.method_name.to_lowercase()))
            })
            .collect();
        if mocks.is_empty() {
            return Ok(0);
        }
        let count = mocks.len();
        save_mock_file(&MockFileNode::with_nodes(path, mocks))?;
        info!("Exported {} new mocks to {}", count, path.display());
        Ok(count)
    }
}

impl ActivitySink for ActivityLog {
    fn record(&self, entry: &ActivityEntry) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
    }
}
