//! CLI binary for fileforge.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `EngineConfig`, runs one batch, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use fileforge::{
    Artifact, BatchProgress, ConversionEngine, ConversionRequest, EngineConfig, SourceKind,
    TargetFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar across the batch, one log line per item.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl BatchProgress for CliProgress {
    fn on_batch_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
    }

    fn on_item_start(&self, _index: usize, _total: usize, original_name: &str) {
        self.bar.set_message(original_name.to_string());
    }

    fn on_item_converted(&self, index: usize, total: usize, original_name: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            original_name,
        ));
        self.bar.inc(1);
    }

    fn on_item_failed(&self, index: usize, total: usize, original_name: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            original_name,
            red(&msg),
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Re-encode an image
  fileforge photo.png --to webp

  # Lossy encode at explicit quality
  fileforge scan.png --to jpg --quality 75

  # Rasterise a PDF into one image per page
  fileforge report.pdf --to png

  # Document to PDF via headless LibreOffice
  fileforge notes.docx --to pdf

  # High-fidelity PDF to DOCX (pdf2docx)
  fileforge contract.pdf --to docx

  # A batch; failures are isolated per file
  fileforge a.docx b.docx c.docx --to pdf

  # JSON result record instead of the summary
  fileforge report.pdf --to png --json

EXTERNAL ENGINES:
  docx/odt/rtf → pdf/docx/odt   needs `libreoffice` (see --libreoffice)
  pdf → docx                    needs python3 + pdf2docx (see --python-script)
  pdf → images                  needs a pdfium shared library on the system

FILE HANDLING:
  Inputs are copied into the upload root, consumed by the conversion, and
  deleted afterwards; originals on the command line are left untouched.
  Outputs land in the output root (default ./converted).
"#;

/// Convert images, PDFs, and office documents between formats.
#[derive(Parser, Debug)]
#[command(
    name = "fileforge",
    version,
    about = "Convert images, PDFs, and office documents between formats",
    long_about = "Batch file conversion driven by four engines: in-process image re-encoding, \
PDF rasterisation via pdfium, headless LibreOffice for document round-trips, and a Python \
pdf2docx subprocess for high-fidelity PDF to DOCX reconstruction.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files. All must be of the same kind (images, PDFs, or documents).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target format: jpg, png, webp, avif, pdf, docx, odt.
    #[arg(short, long, value_name = "FORMAT")]
    to: String,

    /// Lossy-encoder quality, 1–100. Out-of-range values fall back to the default.
    #[arg(short, long, env = "FILEFORGE_QUALITY")]
    quality: Option<i64>,

    /// Directory for converted artifacts.
    #[arg(short, long, env = "FILEFORGE_OUTPUT_DIR", default_value = "converted")]
    output_dir: PathBuf,

    /// Working directory for uploads and scratch space.
    #[arg(long, env = "FILEFORGE_WORK_DIR", default_value = ".fileforge")]
    work_dir: PathBuf,

    /// LibreOffice binary.
    #[arg(long, env = "FILEFORGE_LIBREOFFICE", default_value = "libreoffice")]
    libreoffice: PathBuf,

    /// Timeout for one LibreOffice invocation, in seconds.
    #[arg(long, env = "FILEFORGE_LIBREOFFICE_TIMEOUT", default_value_t = 45)]
    libreoffice_timeout: u64,

    /// The pdf2docx wrapper script.
    #[arg(long, env = "FILEFORGE_PYTHON_SCRIPT", default_value = "pdf_converter.py")]
    python_script: PathBuf,

    /// Python virtualenv holding pdf2docx; the system python3 is used when absent.
    #[arg(long, env = "FILEFORGE_VENV", default_value = "venv")]
    venv: PathBuf,

    /// Output the batch result as JSON instead of the summary.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "FILEFORGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILEFORGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(long, env = "FILEFORGE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let target: TargetFormat = cli
        .to
        .parse()
        .with_context(|| format!("Unsupported target format '{}'", cli.to))?;

    let source = infer_source_kind(&cli.inputs)?;

    // ── Build the engine ─────────────────────────────────────────────────
    let mut builder = EngineConfig::builder()
        .upload_root(cli.work_dir.join("uploads"))
        .temp_root(cli.work_dir.join("temp"))
        .output_root(&cli.output_dir)
        .headless_binary(&cli.libreoffice)
        .headless_timeout_secs(cli.libreoffice_timeout)
        .reconstruct_script(&cli.python_script)
        .reconstruct_venv(&cli.venv);

    if show_progress {
        builder = builder.progress(CliProgress::new() as Arc<dyn BatchProgress>);
    }

    let config = builder.build().context("Invalid configuration")?;
    let engine = ConversionEngine::new(config).context("Failed to initialise engine")?;

    // ── Stage inputs ─────────────────────────────────────────────────────
    // The engine consumes (deletes) its inputs, so each file is copied
    // into the upload root rather than handed over in place.
    let mut items = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let name = input
            .file_name()
            .with_context(|| format!("Input has no file name: {}", input.display()))?
            .to_string_lossy()
            .into_owned();
        let staged = engine.store().upload_root().join(&name);
        std::fs::copy(input, &staged)
            .with_context(|| format!("Failed to stage {}", input.display()))?;
        items.push(
            Artifact::from_path(staged, name.clone())
                .with_context(|| format!("Failed to read staged file for {name}"))?,
        );
    }

    // ── Run the batch ────────────────────────────────────────────────────
    let mut request = ConversionRequest::new(source, target, items);
    if let Some(q) = cli.quality {
        request = request.with_quality(q);
    }

    let batch = engine.convert(request).await.context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&batch).context("Failed to serialise result")?
        );
    } else if !cli.quiet {
        if batch.failed == 0 {
            eprintln!(
                "{} {} files converted  →  {}",
                green("✔"),
                bold(&batch.converted.to_string()),
                bold(&cli.output_dir.display().to_string()),
            );
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed)",
                if batch.converted == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&batch.converted.to_string()),
                batch.total,
                red(&batch.failed.to_string()),
            );
            for failure in &batch.errors {
                eprintln!("   {} {}: {}", red("✗"), failure.original_name, failure.error);
            }
        }
        for item in &batch.results {
            eprintln!(
                "   {}  {}",
                item.filename,
                dim(&format!("{} bytes", item.file_size))
            );
        }
    }

    if batch.converted == 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Classify the batch by its first recognisable input.
///
/// Every input must agree on the kind; a mixed batch is rejected here
/// rather than silently dropping the minority.
fn infer_source_kind(inputs: &[PathBuf]) -> Result<SourceKind> {
    let mut kind: Option<SourceKind> = None;
    for input in inputs {
        let this = SourceKind::of_path(input).with_context(|| {
            format!("Cannot classify input by extension: {}", input.display())
        })?;
        match kind {
            None => kind = Some(this),
            Some(k) if k == this => {}
            Some(k) => anyhow::bail!(
                "Mixed batch: {} is a {} but earlier inputs are {}s",
                input.display(),
                this,
                k
            ),
        }
    }
    kind.context("No inputs given")
}
