//! Configuration types for mockwire.

mod listen;
mod matching;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hyper::header::HeaderName;
use serde::{Deserialize, Serialize};

pub use listen::ListenConfig;
pub use matching::{FieldPaths, MatchConfig, MatchingFiles};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// How long TimeOut faults and response-less mocks hold the connection
    #[serde(default = "default_service_timeout_secs")]
    pub service_timeout_secs: u64,
    /// Header echoed back from request to response
    #[serde(default = "default_correlation_header")]
    pub correlation_header: String,
    #[serde(default)]
    pub mocks: MocksConfig,
    #[serde(default)]
    pub matching: MatchingFiles,
    #[serde(default)]
    pub activity: ActivityConfig,
}

fn default_service_timeout_secs() -> u64 {
    100
}

fn default_correlation_header() -> String {
    "X-Correlation-Id".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            service_timeout_secs: default_service_timeout_secs(),
            correlation_header: default_correlation_header(),
            mocks: MocksConfig::default(),
            matching: MatchingFiles::default(),
            activity: ActivityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MocksConfig {
    /// Directory scanned recursively for mock files
    #[serde(default = "default_mocks_directory")]
    pub directory: PathBuf,
}

fn default_mocks_directory() -> PathBuf {
    PathBuf::from("mocks")
}

impl Default for MocksConfig {
    fn default() -> Self {
        Self {
            directory: default_mocks_directory(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActivityConfig {
    /// Entries kept in the in-memory activity log
    #[serde(default = "default_activity_capacity")]
    pub capacity: usize,
}

fn default_activity_capacity() -> usize {
    1000
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            capacity: default_activity_capacity(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.service_timeout_secs == 0 {
            anyhow::bail!("service_timeout_secs must be greater than zero");
        }

        if self.correlation_header.is_empty() {
            anyhow::bail!("correlation_header must not be empty");
        }
        if HeaderName::from_bytes(self.correlation_header.as_bytes()).is_err() {
            anyhow::bail!(
                "Invalid correlation_header '{}': not a valid HTTP header name",
                self.correlation_header
            );
        }

        if self.activity.capacity == 0 {
            anyhow::bail!("activity.capacity must be greater than zero");
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.listen.socket_addr()
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_secs)
    }
}
