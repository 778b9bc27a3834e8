//! Error types for diagram operations

use std::path::PathBuf;

use thiserror::Error;

use crate::renderer::RenderError;

/// Errors that can occur during diagram operations
#[derive(Error, Debug)]
pub enum DiagramError {
    /// Unsupported output format
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Compressing a diagram source failed
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// A token could not be decoded back into diagram text
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The input directory is missing or not a directory
    #[error("Input directory not found: {}", .0.display())]
    InputDir(PathBuf),

    /// Source discovery pattern could not be built
    #[error("Invalid source pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Building the HTTP client failed
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    /// Rendering a diagram failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// IO error on a specific path
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
}

impl DiagramError {
    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for diagram operations
pub type Result<T> = std::result::Result<T, DiagramError>;
