//! Reading and writing mock files.
//!
//! A mock file is a JSON or YAML array of [`MockNode`]s. The format is picked
//! from the file extension.

use super::types::{MockFileNode, MockNode};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading, saving or editing mock files.
#[derive(Debug, Error)]
pub enum MockFileError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Unsupported mock file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Mock file not loaded: {}", .0.display())]
    UnknownFile(PathBuf),
    #[error("Mock file already loaded: {}", .0.display())]
    AlreadyLoaded(PathBuf),
    #[error("Mock index {index} out of bounds for {}", .path.display())]
    IndexOutOfBounds { path: PathBuf, index: usize },
}

/// On-disk encoding of a mock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFileFormat {
    Json,
    Yaml,
}

impl MockFileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(MockFileFormat::Json),
            "yaml" | "yml" => Some(MockFileFormat::Yaml),
            _ => None,
        }
    }
}

/// Load one mock file.
pub fn load_mock_file(path: &Path) -> Result<MockFileNode, MockFileError> {
    let format = MockFileFormat::from_path(path)
        .ok_or_else(|| MockFileError::UnsupportedFormat(path.to_path_buf()))?;
    let contents = fs::read_to_string(path).map_err(|source| MockFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let nodes = parse_mocks(&contents, format, path)?;
    Ok(MockFileNode::with_nodes(path, nodes))
}

/// Parse mock file contents in the given format.
pub fn parse_mocks(
    contents: &str,
    format: MockFileFormat,
    path: &Path,
) -> Result<Vec<MockNode>, MockFileError> {
    match format {
        MockFileFormat::Json => {
            serde_json::from_str(contents).map_err(|source| MockFileError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
        MockFileFormat::Yaml => {
            // An empty YAML document is an empty file, not an error
            if contents.trim().is_empty() {
                return Ok(Vec::new());
            }
            serde_yaml::from_str(contents).map_err(|source| MockFileError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Write a mock file back in the format implied by its extension.
pub fn save_mock_file(file: &MockFileNode) -> Result<(), MockFileError> {
    let path = file.path();
    let format = MockFileFormat::from_path(path)
        .ok_or_else(|| MockFileError::UnsupportedFormat(path.to_path_buf()))?;
    let mocks = file.to_mocks();
    let contents = match format {
        MockFileFormat::Json => {
            serde_json::to_string_pretty(&mocks).map_err(|source| MockFileError::Json {
                path: path.to_path_buf(),
                source,
            })?
        }
        MockFileFormat::Yaml => {
            serde_yaml::to_string(&mocks).map_err(|source| MockFileError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        }
    };
    fs::write(path, contents).map_err(|source| MockFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursively collect supported mock files under `dir`, sorted by path.
pub fn collect_mock_files(dir: &Path) -> Result<Vec<PathBuf>, MockFileError> {
    let mut files = Vec::new();
    collect_into(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), MockFileError> {
    let entries = fs::read_dir(dir).map_err(|source| MockFileError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| MockFileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_into(&path, files)?;
        } else if MockFileFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    Ok(())
}
