//! The set of loaded mock files and the edits applied to them.
//!
//! Every change to the loaded files rebuilds the match repository so that the
//! server always answers from the current state.

use super::file::{collect_mock_files, load_mock_file, save_mock_file, MockFileError};
use super::types::{FaultTag, MockFileNode, MockNode};
use crate::matching::MatchRepository;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of loading a directory of mock files.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, MockFileError)>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Loaded mock files, kept in load order.
pub struct MockLibrary {
    files: RwLock<Vec<MockFileNode>>,
    repository: Arc<MatchRepository>,
}

impl MockLibrary {
    pub fn new(repository: Arc<MatchRepository>) -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<MatchRepository> {
        &self.repository
    }

    /// Load every mock file under `dir`.
    ///
    /// A file that fails to load is reported and skipped. Files already
    /// loaded from the same path are replaced by the fresh copy.
    pub fn load_directory(&self, dir: &Path) -> Result<LoadReport, MockFileError> {
        let paths = collect_mock_files(dir)?;
        let mut report = LoadReport::default();
        let mut files = self.files.write();

        for path in paths {
            match load_mock_file(&path) {
                Ok(file) => {
                    debug!("Loaded {} mocks from {}", file.len(), path.display());
                    match files.iter_mut().find(|f| f.path() == path) {
                        Some(existing) => *existing = file,
                        None => files.push(file),
                    }
                    report.loaded.push(path);
                }
                Err(e) => {
                    warn!("Skipping mock file {}: {}", path.display(), e);
                    report.failed.push((path, e));
                }
            }
        }

        info!(
            "Loaded {} mock files from {} ({} failed)",
            report.loaded.len(),
            dir.display(),
            report.failed.len()
        );
        self.repository.build_repository(&files);
        Ok(report)
    }

    /// Load a single file, returning the number of mocks it holds.
    pub fn open_file(&self, path: &Path) -> Result<usize, MockFileError> {
        let mut files = self.files.write();
        if files.iter().any(|f| f.path() == path) {
            return Err(MockFileError::AlreadyLoaded(path.to_path_buf()));
        }
        let file = load_mock_file(path)?;
        let count = file.len();
        files.push(file);
        self.repository.build_repository(&files);
        Ok(count)
    }

    /// Unload a file without saving it.
    pub fn close_file(&self, path: &Path) -> Result<MockFileNode, MockFileError> {
        let mut files = self.files.write();
        let position = files
            .iter()
            .position(|f| f.path() == path)
            .ok_or_else(|| MockFileError::UnknownFile(path.to_path_buf()))?;
        let closed = files.remove(position);
        if closed.is_dirty() {
            warn!("Closed {} with unsaved changes", path.display());
        }
        self.repository.build_repository(&files);
        Ok(closed)
    }

    /// Append a mock to a loaded file, returning its index.
    pub fn add_mock(&self, path: &Path, mock: MockNode) -> Result<usize, MockFileError> {
        self.edit(path, |file| Ok(file.push(mock)))
    }

    /// Replace the mock at `index`, returning the previous one.
    pub fn update_mock(
        &self,
        path: &Path,
        index: usize,
        mock: MockNode,
    ) -> Result<Arc<MockNode>, MockFileError> {
        self.edit(path, |file| {
            file.replace(index, mock)
                .ok_or_else(|| out_of_bounds(file.path(), index))
        })
    }

    pub fn remove_mock(&self, path: &Path, index: usize) -> Result<Arc<MockNode>, MockFileError> {
        self.edit(path, |file| {
            file.remove(index)
                .ok_or_else(|| out_of_bounds(file.path(), index))
        })
    }

    /// Set or clear the fault simulated by the mock at `index`.
    pub fn set_fault(
        &self,
        path: &Path,
        index: usize,
        fault: Option<FaultTag>,
    ) -> Result<(), MockFileError> {
        self.edit(path, |file| {
            if file.set_fault(index, fault) {
                Ok(())
            } else {
                Err(out_of_bounds(file.path(), index))
            }
        })
    }

    /// Write a loaded file back to disk and clear its dirty flag.
    pub fn save_file(&self, path: &Path) -> Result<(), MockFileError> {
        let mut files = self.files.write();
        let file = files
            .iter_mut()
            .find(|f| f.path() == path)
            .ok_or_else(|| MockFileError::UnknownFile(path.to_path_buf()))?;
        save_mock_file(file)?;
        file.mark_clean();
        info!("Saved {} mocks to {}", file.len(), path.display());
        Ok(())
    }

    /// Snapshot of the loaded files.
    pub fn files(&self) -> Vec<MockFileNode> {
        self.files.read().clone()
    }

    /// Dirty flag of a loaded file, `None` when the file is not loaded.
    pub fn is_dirty(&self, path: &Path) -> Option<bool> {
        self.files
            .read()
            .iter()
            .find(|f| f.path() == path)
            .map(MockFileNode::is_dirty)
    }

    fn edit<T>(
        &self,
        path: &Path,
        apply: impl FnOnce(&mut MockFileNode) -> Result<T, MockFileError>,
    ) -> Result<T, MockFileError> {
        let mut files = self.files.write();
        let file = files
            .iter_mut()
            .find(|f| f.path() == path)
            .ok_or_else(|| MockFileError::UnknownFile(path.to_path_buf()))?;
        let result = apply(file)?;
        self.repository.build_repository(&files);
        Ok(result)
    }
}

fn out_of_bounds(path: &Path, index: usize) -> MockFileError {
    MockFileError::IndexOutOfBounds {
        path: path.to_path_buf(),
        index,
    }
}
