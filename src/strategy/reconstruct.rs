//! High-fidelity PDF→DOCX reconstruction via the pdf2docx subprocess.
//!
//! ## A narrow RPC over stdout
//!
//! The wrapper script is invoked with positional input/output paths and
//! `--json`, and must print exactly one JSON record on stdout:
//!
//! ```json
//! {"success": true, "statistics": {"total_pages": 3, "converted_pages": 3,
//!  "format": "...", "preserves": ["formatting", "tables"]}, "file_size": 12345}
//! ```
//!
//! The record is the contract; parsing is strict and an empty or
//! truncated stream is never trusted as success. Three failure classes
//! stay distinguishable for the caller:
//!
//! 1. nothing on stdout — the converter or its interpreter environment is
//!    not installed; a deployment problem, not a document problem;
//! 2. a record with `success: false` — the engine's own error text is
//!    surfaced verbatim;
//! 3. an unparsable stream — a conversion error wrapping the parse
//!    failure.

use crate::artifact::Artifact;
use crate::config::{ConvertOptions, EngineConfig};
use crate::error::ConvertError;
use crate::outcome::{Converted, OutputArtifact, ReconstructionStats};
use crate::sanitize::sanitize_base_name;
use crate::store::ArtifactStore;
use crate::strategy::invoke::{prepend_path, EngineInvocation};
use crate::strategy::{ConvertStrategy, StrategyOutcome};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const ENGINE: &str = "pdf2docx";

/// The single JSON record the engine prints on stdout.
#[derive(Debug, Deserialize)]
struct EngineReport {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    statistics: Option<ReconstructionStats>,
    #[serde(default)]
    file_size: Option<u64>,
}

pub struct ReconstructStrategy {
    config: Arc<EngineConfig>,
    store: Arc<ArtifactStore>,
}

impl ReconstructStrategy {
    pub fn new(config: Arc<EngineConfig>, store: Arc<ArtifactStore>) -> Self {
        Self { config, store }
    }

    /// The venv interpreter when present, else the system one.
    fn interpreter(&self) -> (PathBuf, bool) {
        let venv_python = self.config.reconstruct_venv.join("bin").join("python");
        if venv_python.is_file() {
            (venv_python, true)
        } else {
            (self.config.system_python.clone(), false)
        }
    }
}

#[async_trait]
impl ConvertStrategy for ReconstructStrategy {
    fn name(&self) -> &'static str {
        ENGINE
    }

    async fn convert(
        &self,
        artifact: &Artifact,
        _options: &ConvertOptions,
    ) -> Result<StrategyOutcome, ConvertError> {
        let base = sanitize_base_name(&artifact.original_name);
        let (dest, file_name) = self.store.allocate_output(&base, "docx");

        let (python, in_venv) = self.interpreter();
        debug!(python = %python.display(), in_venv, "selected interpreter");

        let mut invocation = EngineInvocation::new(
            ENGINE,
            &python,
            Duration::from_secs(self.config.reconstruct_timeout_secs),
        )
        .arg(&self.config.reconstruct_script)
        .arg(&artifact.path)
        .arg(&dest)
        .arg("--json");

        if in_venv {
            invocation = invocation
                .env("VIRTUAL_ENV", &self.config.reconstruct_venv)
                .env(
                    "PATH",
                    prepend_path(&self.config.reconstruct_venv.join("bin")),
                );
        }

        let output = invocation.run().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Err(ConvertError::EmptyEngineOutput { engine: ENGINE });
        }

        let report: EngineReport =
            serde_json::from_str(stdout).map_err(|source| ConvertError::MalformedEngineOutput {
                engine: ENGINE,
                source,
            })?;

        if !report.success {
            return Err(ConvertError::EngineReported {
                engine: ENGINE,
                message: report
                    .error
                    .unwrap_or_else(|| "conversion failed without detail".to_string()),
            });
        }

        let size_bytes = std::fs::metadata(&dest)
            .map_err(|source| ConvertError::OutputWriteFailed {
                path: dest.clone(),
                source,
            })?
            .len();

        // file_size arrives beside statistics on the wire; fold it in so
        // callers get one record.
        let statistics = report.statistics.map(|mut stats| {
            stats.file_size = stats.file_size.or(report.file_size);
            stats
        });

        if let Some(stats) = &statistics {
            info!(
                pages = %stats.total_pages,
                size_bytes,
                "PDF reconstructed into DOCX"
            );
        }

        // The engine's own format description doubles as the fidelity
        // label shown to the user.
        let quality = statistics
            .as_ref()
            .and_then(|s| s.format.clone())
            .unwrap_or_else(|| "High-quality PDF to DOCX conversion".to_string());

        Ok(StrategyOutcome::Converted(Converted {
            outputs: vec![OutputArtifact {
                path: dest,
                file_name,
                size_bytes,
                page: None,
            }],
            method: "pdf2docx reconstruction",
            statistics,
            quality: Some(quality),
        }))
    }
}
