//! Diagram renderer trait and error types
//!
//! This module defines the seam between the batch driver and whatever turns
//! an encoded payload into image bytes. [`crate::PlantUmlClient`] is the
//! network implementation; tests plug in their own.

use std::time::Duration;

use crate::encoding::EncodedPayload;
use crate::types::OutputFormat;

/// Errors that can occur while rendering one diagram
///
/// Every variant is recoverable at batch level: the driver records it
/// against the source and continues with the next one.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The request did not complete within the configured timeout
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Connection, DNS or other transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Server answered with success but the body is unusable
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl RenderError {
    /// Whether a later attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::UnexpectedResponse(_) => false,
        }
    }
}

/// Result type for renderer operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Trait for diagram renderers
///
/// # Thread Safety
///
/// Renderers must be `Send + Sync` so a driver can be shared across threads,
/// even though batches themselves run sequentially.
pub trait DiagramRenderer: Send + Sync {
    /// Human-readable name of this renderer
    fn name(&self) -> &'static str;

    /// Render an encoded diagram to the specified format
    ///
    /// The returned bytes are opaque: no image validation takes place.
    fn render(&self, payload: &EncodedPayload, format: OutputFormat) -> RenderResult<Vec<u8>>;
}
