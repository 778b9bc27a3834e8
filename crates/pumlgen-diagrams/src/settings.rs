//! Configuration settings
//!
//! Settings are read from a TOML file; every section and field is optional.
//!
//! ```toml
//! [batch]
//! input_dir = "Documentation/UML"
//! output_dir = "Documentation/Images"
//!
//! [server]
//! url = "http://localhost:8080"
//! timeout_secs = 10
//!
//! [retry]
//! max_retries = 2
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DiagramError, Result};
use crate::types::OutputFormat;

/// Default PlantUML server URL
pub const DEFAULT_SERVER_URL: &str = "http://www.plantuml.com/plantuml";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default diagram source extension
pub const DEFAULT_EXTENSION: &str = "puml";

/// Top-level settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Input/output locations
    pub batch: BatchSettings,
    /// Rendering server
    pub server: ServerSettings,
    /// Retry policy for transient failures
    pub retry: RetrySettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DiagramError::io(path, e))?;
        Self::from_toml_str(&content)
    }
}

/// Where sources are read from and images written to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Directory scanned for diagram sources
    pub input_dir: PathBuf,
    /// Directory receiving rendered images
    pub output_dir: PathBuf,
    /// Source file extension, without the dot
    pub extension: String,
    /// Image format requested from the server
    pub format: OutputFormat,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("Documentation/UML"),
            output_dir: PathBuf::from("Documentation/Images"),
            extension: DEFAULT_EXTENSION.to_string(),
            format: OutputFormat::Png,
        }
    }
}

/// PlantUML server connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL; the format and token are appended as path segments
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Retry configuration
///
/// The default of zero retries keeps one attempt per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Base delay between attempts in milliseconds, multiplied by the attempt number
    pub backoff_ms: u64,
}

impl RetrySettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 500,
        }
    }
}
