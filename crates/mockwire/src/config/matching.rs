//! Field-path configuration for body matching.
//!
//! Each file maps `url -> method -> [field paths]`:
//!
//! ```json
//! { "/api/customers": { "POST": ["customer.id", "customer.type"] } }
//! ```
//!
//! REST files hold JSON field paths, SOAP files slash-separated element paths.

use crate::mock::ServiceType;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type RawFieldPaths = HashMap<String, HashMap<String, Vec<String>>>;

/// Field paths keyed by lower-cased url and method.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawFieldPaths")]
pub struct FieldPaths {
    by_url: HashMap<String, HashMap<String, Vec<String>>>,
}

impl From<RawFieldPaths> for FieldPaths {
    fn from(raw: RawFieldPaths) -> Self {
        let by_url = raw
            .into_iter()
            .map(|(url, methods)| {
                let methods = methods
                    .into_iter()
                    .map(|(method, paths)| (method.to_lowercase(), paths))
                    .collect();
                (url.trim().to_lowercase(), methods)
            })
            .collect();
        Self { by_url }
    }
}

impl FieldPaths {
    /// Parse a field-path file. A missing file yields an empty mapping.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        if !path.exists() {
            debug!("Match config {} not found, using empty mapping", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read match config {}", path.display()))?;
        let paths: FieldPaths = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid match config {}", path.display()))?;
        info!(
            "Loaded match config {} ({} urls)",
            path.display(),
            paths.len()
        );
        Ok(paths)
    }

    pub fn insert(&mut self, url: &str, method: &str, paths: Vec<String>) {
        self.by_url
            .entry(url.trim().to_lowercase())
            .or_default()
            .insert(method.to_lowercase(), paths);
    }

    /// Field paths configured for `url` (any case) and `method`.
    pub fn get(&self, url: &str, method: &str) -> Option<&[String]> {
        self.by_url
            .get(&url.to_lowercase())?
            .get(&method.to_lowercase())
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

/// Field paths for both service types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchConfig {
    pub rest: FieldPaths,
    pub soap: FieldPaths,
}

impl MatchConfig {
    pub fn load(rest: &Path, soap: &Path) -> Result<Self, anyhow::Error> {
        Ok(Self {
            rest: FieldPaths::load(rest)?,
            soap: FieldPaths::load(soap)?,
        })
    }

    pub fn for_service(&self, service_type: ServiceType) -> &FieldPaths {
        match service_type {
            ServiceType::Rest => &self.rest,
            ServiceType::Soap => &self.soap,
        }
    }
}

/// Locations of the two field-path files.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MatchingFiles {
    #[serde(default = "default_rest_file")]
    pub rest: PathBuf,
    #[serde(default = "default_soap_file")]
    pub soap: PathBuf,
}

fn default_rest_file() -> PathBuf {
    PathBuf::from("RestServiceMatchingConfig.json")
}

fn default_soap_file() -> PathBuf {
    PathBuf::from("SoapServiceMatchingConfig.json")
}

impl Default for MatchingFiles {
    fn default() -> Self {
        Self {
            rest: default_rest_file(),
            soap: default_soap_file(),
        }
    }
}

impl MatchingFiles {
    pub fn load(&self) -> Result<MatchConfig, anyhow::Error> {
        MatchConfig::load(&self.rest, &self.soap)
    }
}
