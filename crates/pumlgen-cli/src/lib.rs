//! pumlgen CLI - Command-line interface library
//!
//! This library provides the CLI functionality for pumlgen:
//! - Render: Render a directory of PlantUML sources to images
//! - Encode: Print the server URL for one diagram
//! - Decode: Turn a URL token back into diagram text
//!
//! # Binary Usage
//!
//! ```bash
//! # Render Documentation/UML/*.puml into Documentation/Images
//! pumlgen render
//!
//! # Use a local server and fail the build on any error
//! pumlgen render --input docs/uml --output docs/img --server http://localhost:8080 --strict
//!
//! # Get a shareable URL
//! pumlgen encode docs/uml/sequence.puml
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{encode_command, render_command, resolve_settings};
pub use app::{init_logging, run_cli, ConsoleObserver, RenderOptions, ReportFormat};
