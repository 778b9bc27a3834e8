//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pumlgen_diagrams::{
    decode_payload, encode_payload, BatchDriver, BatchObserver, BatchReport, Collision,
    DiagramError, DiagramSource, NoopObserver, OutputFormat, PlantUmlClient, RenderError,
    Settings,
};

/// Settings file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "pumlgen.toml";

/// Output format for the batch report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable progress and summary
    #[default]
    Text,
    /// JSON summary for CI/CD consumption
    Json,
}

#[derive(Parser)]
#[command(name = "pumlgen")]
#[command(author, version, about = "Render PlantUML sources via a PlantUML server", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every diagram source in a directory
    Render {
        #[command(flatten)]
        options: RenderOptions,

        /// Report format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        report: ReportFormat,

        /// Strict mode: exit with error code if any diagram failed
        #[arg(long)]
        strict: bool,
    },

    /// Print the server URL for a single diagram file
    Encode {
        /// Diagram source file
        file: PathBuf,

        #[command(flatten)]
        options: RenderOptions,
    },

    /// Decode a URL token back into diagram text
    Decode {
        /// Encoded token (the last path segment of a diagram URL)
        token: String,
    },
}

/// Command-line overrides applied on top of the settings file
#[derive(Debug, Clone, Default, Args)]
pub struct RenderOptions {
    /// Directory containing diagram sources
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory receiving rendered images
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// PlantUML server base URL
    #[arg(long)]
    pub server: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Image format to request
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Retries for timeouts, transport errors and 5xx responses
    #[arg(long)]
    pub retries: Option<u32>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render {
            options,
            report,
            strict,
        } => {
            let report = render_command(&options, report)?;
            let failed = report.summary().map_or(0, |s| s.failed());
            if strict && failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Encode { file, options } => {
            let url = encode_command(&file, &options)?;
            println!("{}", url);
        }
        Commands::Decode { token } => {
            let text = decode_payload(&token).context("Failed to decode token")?;
            print!("{}", text);
        }
    }

    Ok(())
}

/// Install the stderr log subscriber
///
/// Library log records are forwarded through the `log` bridge.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Ignore the error when a subscriber is already installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Load settings and apply command-line overrides
///
/// An explicit `config` must exist. Without one, `pumlgen.toml` in the
/// working directory is used when present.
pub fn resolve_settings(options: &RenderOptions) -> Result<Settings> {
    let mut settings = match options.config.as_deref() {
        Some(path) => load_settings(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            load_settings(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => Settings::default(),
    };

    if let Some(input) = &options.input {
        settings.batch.input_dir = input.clone();
    }
    if let Some(output) = &options.output {
        settings.batch.output_dir = output.clone();
    }
    if let Some(format) = options.format {
        settings.batch.format = format;
    }
    if let Some(server) = &options.server {
        settings.server.url = server.clone();
    }
    if let Some(timeout) = options.timeout {
        settings.server.timeout_secs = timeout;
    }
    if let Some(retries) = options.retries {
        settings.retry.max_retries = retries;
    }

    Ok(settings)
}

fn load_settings(path: &Path) -> Result<Settings> {
    debug!("Loading settings from {}", path.display());
    Settings::load(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Execute the render command
///
/// Per-diagram failures are reported, not returned as errors.
pub fn render_command(options: &RenderOptions, format: ReportFormat) -> Result<BatchReport> {
    let settings = resolve_settings(options)?;
    let driver = BatchDriver::from_settings(&settings).context("Failed to set up renderer")?;

    match format {
        ReportFormat::Text => {
            let mut console = ConsoleObserver::new(io::stdout().lock(), &settings.batch.extension);
            let report = run_batch(&driver, &mut console)?;
            console.finish(&report);
            Ok(report)
        }
        ReportFormat::Json => {
            let report = run_batch(&driver, &mut NoopObserver)?;
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize report to JSON")?;
            println!("{}", json);
            Ok(report)
        }
    }
}

fn run_batch(driver: &BatchDriver, observer: &mut dyn BatchObserver) -> Result<BatchReport> {
    let settings = driver.settings();
    driver.run(observer).with_context(|| {
        format!(
            "Failed to render {} into {}",
            settings.input_dir.display(),
            settings.output_dir.display()
        )
    })
}

/// Execute the encode command, returning the diagram URL
pub fn encode_command(input: &Path, options: &RenderOptions) -> Result<String> {
    let settings = resolve_settings(options)?;

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let payload = encode_payload(&text).context("Failed to encode diagram")?;

    let client = PlantUmlClient::new(&settings.server).context("Failed to set up renderer")?;
    Ok(client.diagram_url(&payload, settings.batch.format))
}

/// Prints batch progress as human-readable lines
pub struct ConsoleObserver<W: Write> {
    out: W,
    extension: String,
}

const RULE_WIDTH: usize = 50;

impl<W: Write> ConsoleObserver<W> {
    pub fn new(out: W, extension: &str) -> Self {
        Self {
            out,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Print the closing summary line
    pub fn finish(&mut self, report: &BatchReport) {
        if let Some(summary) = report.summary() {
            self.line(&"-".repeat(RULE_WIDTH));
            self.line(&format!(
                "Successfully generated {}/{} diagrams",
                summary.succeeded, summary.attempted
            ));
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Console write failures are not worth aborting a batch for
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }
}

impl<W: Write> BatchObserver for ConsoleObserver<W> {
    fn on_discovered(&mut self, count: usize) {
        if count == 0 {
            self.line(&format!("No .{} files found!", self.extension));
        } else {
            self.line(&format!("Found {} PlantUML files", count));
            self.line(&"-".repeat(RULE_WIDTH));
        }
    }

    fn on_collision(&mut self, collision: &Collision) {
        self.line(&format!(
            "Warning: {} all write {}; the last one wins",
            collision.sources.join(", "),
            collision.output
        ));
    }

    fn on_start(&mut self, source: &DiagramSource) {
        self.line(&format!("Processing {}...", source.file_name()));
    }

    fn on_retry(&mut self, _source: &DiagramSource, attempt: u32, error: &RenderError) {
        self.line(&format!("  ↻ Attempt {} failed: {}", attempt, error));
    }

    fn on_success(&mut self, _source: &DiagramSource, output: &Path) {
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.line(&format!("  ✓ Generated {}", name));
    }

    fn on_failure(&mut self, _source: &DiagramSource, error: &DiagramError) {
        self.line(&format!("  ✗ Error: {}", error));
    }
}
