//! Diagram sources and rendered output files

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{DiagramError, Result};
use crate::types::OutputFormat;

/// One diagram source file discovered in the input directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    /// Path of the source file
    pub path: PathBuf,
    /// File stem, used as the output base name
    pub name: String,
}

impl DiagramSource {
    /// Create a source from a file path
    ///
    /// Returns `None` when the path has no UTF-8 file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_stem()?.to_str()?.to_string();
        Some(Self { path, name })
    }

    /// File name of the source, for display
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Read the diagram text
    pub fn load(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| DiagramError::io(&self.path, e))
    }

    /// Output file name for this source: `<name>.<ext>`
    pub fn output_file_name(&self, format: OutputFormat) -> String {
        format!("{}.{}", self.name, format.extension())
    }
}

/// Create the output directory and any missing parents
///
/// Succeeds when the directory already exists.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| DiagramError::io(dir, e))
}

/// Write rendered bytes into `dir/file_name`, replacing any existing file
pub fn write_output(dir: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf> {
    let path = dir.join(file_name);
    fs::write(&path, data).map_err(|e| DiagramError::io(&path, e))?;
    Ok(path)
}

/// Compute SHA-256 hash of content
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    format!("sha256:{}", hex::encode(result))
}

/// Helper to format hash as hex string
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
