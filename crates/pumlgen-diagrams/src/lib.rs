//! # pumlgen-diagrams
//!
//! Batch rendering of PlantUML diagram sources through a
//! [PlantUML server](https://plantuml.com/server).
//!
//! Each `*.puml` file in an input directory is compressed into a URL-safe
//! token, sent to the server, and the returned image is written next to its
//! siblings in an output directory.
//!
//! ## Example
//!
//! ```no_run
//! use pumlgen_diagrams::{BatchDriver, NoopObserver, Settings};
//!
//! let settings = Settings::default();
//! let driver = BatchDriver::from_settings(&settings)?;
//!
//! if let Some(summary) = driver.run(&mut NoopObserver)?.summary() {
//!     println!("{}/{} rendered", summary.succeeded, summary.attempted);
//! }
//! # Ok::<(), pumlgen_diagrams::DiagramError>(())
//! ```

pub mod batch;
pub mod client;
pub mod encoding;
pub mod error;
pub mod renderer;
pub mod settings;
pub mod source;
pub mod types;

pub use batch::{
    discover, find_collisions, BatchDriver, BatchObserver, BatchReport, BatchSummary, Collision,
    NoopObserver, RetryPolicy, SourceOutcome,
};
pub use client::PlantUmlClient;
pub use encoding::{decode_payload, encode_payload, EncodedPayload};
pub use error::{DiagramError, Result};
pub use renderer::{DiagramRenderer, RenderError, RenderResult};
pub use settings::{
    BatchSettings, RetrySettings, ServerSettings, Settings, DEFAULT_SERVER_URL,
};
pub use source::{content_hash, DiagramSource};
pub use types::OutputFormat;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
