//! Mock index and lookup.
//!
//! Mocks are indexed by their lower-cased, query-stripped path. Paths without
//! a `(*)` segment go into a hash map; wildcard paths are kept in insertion
//! order and scanned with [`PathPattern`]. A lookup consults the static map
//! first and only falls back to the wildcard entries when the path has no
//! static entry at all, even if that entry has no mock for the method.
//!
//! The two indexes are published together as one immutable snapshot; a
//! rebuild swaps the snapshot, so a lookup never observes a half-built index.

use super::content::ContentMatcher;
use super::error::MatchError;
use super::path::{normalize_path, PathPattern};
use super::query::{parse_query, query_of, QueryPattern};
use crate::config::{FieldPaths, MatchConfig};
use crate::mock::{MockFileNode, MockNode, ServiceType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A mock with its query constraint compiled.
#[derive(Debug, Clone)]
struct IndexedMock {
    mock: Arc<MockNode>,
    query: QueryPattern,
}

impl IndexedMock {
    fn new(mock: Arc<MockNode>) -> Self {
        let query = QueryPattern::from_url(&mock.url);
        Self { mock, query }
    }

    fn accepts(
        &self,
        service_type: ServiceType,
        method: &str,
        query: Option<&HashMap<String, String>>,
    ) -> bool {
        self.mock.service_type == service_type
            && self.mock.method_name.eq_ignore_ascii_case(method)
            && query.map_or(true, |params| self.query.matches(params))
    }
}

#[derive(Debug, Clone)]
struct DynamicEntry {
    key: String,
    pattern: PathPattern,
    mocks: Vec<IndexedMock>,
}

#[derive(Debug, Default)]
struct MatchIndex {
    static_index: HashMap<String, Vec<IndexedMock>>,
    dynamic_index: Vec<DynamicEntry>,
}

impl MatchIndex {
    fn build(files: &[MockFileNode]) -> Self {
        let mut index = MatchIndex::default();
        let mut dynamic_positions: HashMap<String, usize> = HashMap::new();

        for mock in files.iter().flat_map(|file| file.nodes()) {
            let key = normalize_path(&mock.url);
            let pattern = PathPattern::compile(&mock.url);
            let indexed = IndexedMock::new(Arc::clone(mock));

            if !pattern.is_dynamic() {
                index.static_index.entry(key).or_default().push(indexed);
                continue;
            }
            match dynamic_positions.get(&key) {
                Some(&position) => index.dynamic_index[position].mocks.push(indexed),
                None => {
                    dynamic_positions.insert(key.clone(), index.dynamic_index.len());
                    index.dynamic_index.push(DynamicEntry {
                        key,
                        pattern,
                        mocks: vec![indexed],
                    });
                }
            }
        }
        index
    }
}

/// Index sizes, as reported by `mockwire check`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub static_paths: usize,
    pub dynamic_paths: usize,
    pub mocks: usize,
}

/// Thread-safe mock index answering "which mock serves this request".
#[derive(Debug)]
pub struct MatchRepository {
    index: RwLock<Arc<MatchIndex>>,
    match_config: MatchConfig,
}

impl Default for MatchRepository {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl MatchRepository {
    pub fn new(match_config: MatchConfig) -> Self {
        Self {
            index: RwLock::new(Arc::new(MatchIndex::default())),
            match_config,
        }
    }

    pub fn match_config(&self) -> &MatchConfig {
        &self.match_config
    }

    fn snapshot(&self) -> Arc<MatchIndex> {
        Arc::clone(&self.index.read())
    }

    /// Replace the whole index with the mocks of `files`, in file order.
    pub fn build_repository(&self, files: &[MockFileNode]) {
        let index = MatchIndex::build(files);
        info!(
            "Rebuilt mock index: {} static paths, {} wildcard paths",
            index.static_index.len(),
            index.dynamic_index.len()
        );
        *self.index.write() = Arc::new(index);
    }

    /// Find the mock answering a request.
    ///
    /// `Ok(None)` means nothing matched (the caller answers 404). Errors come
    /// from malformed bodies or invalid field paths during content matching.
    pub fn get_mock(
        &self,
        service_type: ServiceType,
        url: &str,
        method: &str,
        request_body: &str,
    ) -> Result<Option<Arc<MockNode>>, MatchError> {
        let index = self.snapshot();
        let path = normalize_path(url);
        // a url without `?` is not filtered by query at all
        let query = url.contains('?').then(|| parse_query(query_of(url)));
        let field_paths = self.match_config.for_service(service_type);
        let matcher = ContentMatcher::for_service(service_type);

        if let Some(mocks) = index.static_index.get(&path) {
            let candidates = filter_candidates(mocks, service_type, method, query.as_ref());
            debug!(
                "Static path {} has {} candidates for {} {}",
                path,
                candidates.len(),
                service_type,
                method
            );
            let paths = lookup_field_paths(field_paths, url, &path, None, method);
            return matcher.select(request_body, &candidates, paths);
        }

        for entry in &index.dynamic_index {
            if !entry.pattern.matches(&path) {
                continue;
            }
            let candidates = filter_candidates(&entry.mocks, service_type, method, query.as_ref());
            debug!(
                "Wildcard path {} matched {} with {} candidates",
                entry.key,
                path,
                candidates.len()
            );
            let paths =
                lookup_field_paths(field_paths, url, &path, Some(entry.key.as_str()), method);
            return matcher.select(request_body, &candidates, paths);
        }

        debug!("No indexed path for {}", path);
        Ok(None)
    }

    /// Whether any mock is registered for `url` and `method`, ignoring body,
    /// query and service type.
    pub fn is_mock_exists(&self, url: &str, method: &str) -> bool {
        let index = self.snapshot();
        let path = normalize_path(url);
        let has_method = |mocks: &[IndexedMock]| {
            mocks
                .iter()
                .any(|m| m.mock.method_name.eq_ignore_ascii_case(method))
        };

        if index.static_index.get(&path).is_some_and(|m| has_method(m)) {
            return true;
        }
        index
            .dynamic_index
            .iter()
            .any(|entry| entry.pattern.matches(&path) && has_method(&entry.mocks))
    }

    pub fn stats(&self) -> IndexStats {
        let index = self.snapshot();
        let static_mocks: usize = index.static_index.values().map(Vec::len).sum();
        let dynamic_mocks: usize = index.dynamic_index.iter().map(|e| e.mocks.len()).sum();
        IndexStats {
            static_paths: index.static_index.len(),
            dynamic_paths: index.dynamic_index.len(),
            mocks: static_mocks + dynamic_mocks,
        }
    }
}

fn filter_candidates(
    mocks: &[IndexedMock],
    service_type: ServiceType,
    method: &str,
    query: Option<&HashMap<String, String>>,
) -> Vec<Arc<MockNode>> {
    mocks
        .iter()
        .filter(|m| m.accepts(service_type, method, query))
        .map(|m| Arc::clone(&m.mock))
        .collect()
}

/// Field paths for a request: full url first, then the bare path, then the
/// wildcard key that matched.
fn lookup_field_paths<'a>(
    field_paths: &'a FieldPaths,
    url: &str,
    path: &str,
    dynamic_key: Option<&str>,
    method: &str,
) -> Option<&'a [String]> {
    field_paths
        .get(url, method)
        .or_else(|| field_paths.get(path, method))
        .or_else(|| dynamic_key.and_then(|key| field_paths.get(key, method)))
}
