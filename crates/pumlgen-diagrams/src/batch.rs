//! Batch rendering of a directory of diagram sources
//!
//! # Flow
//!
//! ```text
//! discover ──► (none) ──► NothingToDo
//!    │
//!    ▼
//! collision check ─► create output dir ─► for each source (sorted):
//!                                           load ─► encode ─► render ─► write
//!                                                                       │
//!                                         Completed(BatchSummary) ◄─────┘
//! ```
//!
//! Sources run strictly one after another. A failure on one source is
//! recorded and the batch continues; only discovery and output directory
//! creation can abort a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::{glob, Pattern};
use serde::Serialize;

use crate::client::PlantUmlClient;
use crate::encoding::{encode_payload, EncodedPayload};
use crate::error::{DiagramError, Result};
use crate::renderer::{DiagramRenderer, RenderError};
use crate::settings::{BatchSettings, RetrySettings, Settings};
use crate::source::{content_hash, ensure_output_dir, write_output, DiagramSource};
use crate::types::OutputFormat;

/// Find diagram sources in `input_dir` with the given extension
///
/// Only regular files directly inside the directory are considered. The
/// result is sorted by file name so runs are reproducible.
pub fn discover(input_dir: &Path, extension: &str) -> Result<Vec<DiagramSource>> {
    if !input_dir.is_dir() {
        return Err(DiagramError::InputDir(input_dir.to_path_buf()));
    }

    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&input_dir.to_string_lossy()),
        Pattern::escape(extension.trim_start_matches('.'))
    );

    let mut sources = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            DiagramError::io(path, e.into_error())
        })?;
        if !path.is_file() {
            continue;
        }
        match DiagramSource::from_path(path) {
            Some(source) => sources.push(source),
            None => log::warn!("Skipping source with non UTF-8 name in {}", input_dir.display()),
        }
    }

    sources.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(sources)
}

/// Several sources that map onto the same output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// Output file name (as produced by the last source)
    pub output: String,
    /// Source file names in processing order; the last one wins
    pub sources: Vec<String>,
}

/// Detect sources whose output names differ only by ASCII case or not at all
///
/// Such outputs overwrite each other on case-insensitive filesystems.
pub fn find_collisions(sources: &[DiagramSource], format: OutputFormat) -> Vec<Collision> {
    let mut groups: BTreeMap<String, Vec<&DiagramSource>> = BTreeMap::new();
    for source in sources {
        groups
            .entry(source.output_file_name(format).to_ascii_lowercase())
            .or_default()
            .push(source);
    }

    groups
        .into_values()
        .filter(|group| group.len() > 1)
        .filter_map(|group| {
            let last = group.last()?;
            Some(Collision {
                output: last.output_file_name(format),
                sources: group.iter().map(|s| s.file_name()).collect(),
            })
        })
        .collect()
}

/// Retry policy for transient render failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::default()
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff: settings.backoff(),
        }
    }
}

/// Result of processing one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    /// Source base name
    pub name: String,
    /// Source file path
    pub source: PathBuf,
    /// Hash of the source text, when it could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    /// Written image, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Failure cause, on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of render requests made
    pub attempts: u32,
}

impl SourceOutcome {
    fn new(source: &DiagramSource) -> Self {
        Self {
            name: source.name.clone(),
            source: source.path.clone(),
            source_hash: None,
            output: None,
            error: None,
            attempts: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }
}

/// Tally of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Sources attempted
    pub attempted: usize,
    /// Sources rendered and written
    pub succeeded: usize,
    /// Output collisions found before processing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<Collision>,
    /// Per-source results, in processing order
    pub outcomes: Vec<SourceOutcome>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    /// True when every attempted source succeeded
    pub fn is_success(&self) -> bool {
        self.succeeded == self.attempted
    }

    fn record(&mut self, outcome: SourceOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Final state of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum BatchReport {
    /// No sources were found; nothing was created
    NothingToDo,
    /// All discovered sources were processed
    Completed(BatchSummary),
}

impl BatchReport {
    /// Summary of a completed run, if any source was found
    pub fn summary(&self) -> Option<&BatchSummary> {
        match self {
            Self::NothingToDo => None,
            Self::Completed(summary) => Some(summary),
        }
    }
}

/// Progress hooks invoked while a batch runs
///
/// All methods default to doing nothing.
pub trait BatchObserver {
    fn on_discovered(&mut self, _count: usize) {}

    fn on_collision(&mut self, _collision: &Collision) {}

    fn on_start(&mut self, _source: &DiagramSource) {}

    /// A transient failure will be retried; `attempt` is the failed attempt
    fn on_retry(&mut self, _source: &DiagramSource, _attempt: u32, _error: &RenderError) {}

    fn on_success(&mut self, _source: &DiagramSource, _output: &Path) {}

    fn on_failure(&mut self, _source: &DiagramSource, _error: &DiagramError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Runs the load, encode, render, write pipeline over a directory
pub struct BatchDriver {
    settings: BatchSettings,
    renderer: Box<dyn DiagramRenderer>,
    retry: RetryPolicy,
}

impl BatchDriver {
    /// Create a driver with an explicit renderer and no retries
    pub fn new(settings: BatchSettings, renderer: Box<dyn DiagramRenderer>) -> Self {
        Self {
            settings,
            renderer,
            retry: RetryPolicy::none(),
        }
    }

    /// Create a driver talking to the configured PlantUML server
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = PlantUmlClient::new(&settings.server)?;
        Ok(Self::new(settings.batch.clone(), Box::new(client))
            .with_retry(RetryPolicy::from(&settings.retry)))
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Run the batch to completion
    ///
    /// Returns an error only when discovery fails or the output directory
    /// cannot be created. Per-source failures end up in the summary.
    pub fn run(&self, observer: &mut dyn BatchObserver) -> Result<BatchReport> {
        let sources = discover(&self.settings.input_dir, &self.settings.extension)?;
        observer.on_discovered(sources.len());

        if sources.is_empty() {
            log::info!(
                "No .{} files found in {}",
                self.settings.extension,
                self.settings.input_dir.display()
            );
            return Ok(BatchReport::NothingToDo);
        }

        let mut summary = BatchSummary::default();
        for collision in find_collisions(&sources, self.settings.format) {
            log::warn!(
                "Sources {} all write {}; the last one wins",
                collision.sources.join(", "),
                collision.output
            );
            observer.on_collision(&collision);
            summary.collisions.push(collision);
        }

        ensure_output_dir(&self.settings.output_dir)?;

        log::info!(
            "Rendering {} diagrams with {}",
            sources.len(),
            self.renderer.name()
        );
        for source in &sources {
            observer.on_start(source);
            summary.record(self.process(source, observer));
        }

        log::info!(
            "Rendered {}/{} diagrams",
            summary.succeeded,
            summary.attempted
        );
        Ok(BatchReport::Completed(summary))
    }

    fn process(&self, source: &DiagramSource, observer: &mut dyn BatchObserver) -> SourceOutcome {
        let mut outcome = SourceOutcome::new(source);

        match self.render_source(source, &mut outcome, observer) {
            Ok(path) => {
                observer.on_success(source, &path);
                outcome.output = Some(path);
            }
            Err(e) => {
                log::warn!("Failed to render {}: {}", source.file_name(), e);
                observer.on_failure(source, &e);
                outcome.error = Some(e.to_string());
            }
        }

        outcome
    }

    fn render_source(
        &self,
        source: &DiagramSource,
        outcome: &mut SourceOutcome,
        observer: &mut dyn BatchObserver,
    ) -> Result<PathBuf> {
        let text = source.load()?;
        outcome.source_hash = Some(content_hash(text.as_bytes()));

        let payload = encode_payload(&text)?;
        let data = self.render_with_retry(source, &payload, outcome, observer)?;

        write_output(
            &self.settings.output_dir,
            &source.output_file_name(self.settings.format),
            &data,
        )
    }

    fn render_with_retry(
        &self,
        source: &DiagramSource,
        payload: &EncodedPayload,
        outcome: &mut SourceOutcome,
        observer: &mut dyn BatchObserver,
    ) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            outcome.attempts = attempt;

            match self.renderer.render(payload, self.settings.format) {
                Ok(data) => return Ok(data),
                Err(e) if e.is_transient() && attempt <= self.retry.max_retries => {
                    log::debug!("Attempt {} for {} failed: {}", attempt, source.name, e);
                    observer.on_retry(source, attempt, &e);
                    std::thread::sleep(self.retry.backoff * attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
