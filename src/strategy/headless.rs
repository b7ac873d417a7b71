//! Headless LibreOffice strategy: document round-trips via subprocess.
//!
//! ## The engine's quirks, and how each is handled
//!
//! * It names its output file itself, somewhere under the directory given
//!   to `--outdir` — so every invocation gets an exclusive scratch
//!   directory and we discover the result by extension scan.
//! * It has been observed to exit before the output file is flushed — so
//!   a fixed settle interval passes between exit and scan.
//! * It needs a Java runtime that is not guaranteed to be on the default
//!   search path — so `JAVA_HOME` and `PATH` are set explicitly.
//! * It can hang on damaged input — so a hard 45-second deadline applies
//!   and the child is killed past it.
//! * For PDF→DOCX it frequently produces nothing at all without signalling
//!   an error. That case returns [`StrategyOutcome::FallbackRequested`] so
//!   the dispatcher can retry via the high-fidelity engine; it is not a
//!   failure of the item.

use crate::artifact::{Artifact, SourceKind, TargetFormat};
use crate::config::{ConvertOptions, EngineConfig};
use crate::error::ConvertError;
use crate::outcome::{Converted, OutputArtifact};
use crate::sanitize::sanitize_base_name;
use crate::store::ArtifactStore;
use crate::strategy::invoke::{prepend_path, EngineInvocation};
use crate::strategy::{ConvertStrategy, StrategyOutcome};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const ENGINE: &str = "LibreOffice";

/// Export filter table, keyed by target format.
///
/// `--convert-to extension:filter` pins the exact filter instead of
/// letting the engine guess from the extension.
fn export_filter(target: TargetFormat) -> Option<(&'static str, &'static str)> {
    match target {
        TargetFormat::Pdf => Some(("pdf", "writer_pdf_Export")),
        TargetFormat::Docx => Some(("docx", "Office Open XML Text")),
        TargetFormat::Odt => Some(("odt", "writer8")),
        _ => None,
    }
}

pub struct HeadlessStrategy {
    config: Arc<EngineConfig>,
    store: Arc<ArtifactStore>,
}

impl HeadlessStrategy {
    pub fn new(config: Arc<EngineConfig>, store: Arc<ArtifactStore>) -> Self {
        Self { config, store }
    }

    async fn convert_in_temp_dir(
        &self,
        artifact: &Artifact,
        temp_dir: &Path,
        extension: &'static str,
        filter: &'static str,
        target: TargetFormat,
    ) -> Result<StrategyOutcome, ConvertError> {
        let mut invocation = EngineInvocation::new(
            ENGINE,
            &self.config.headless_binary,
            Duration::from_secs(self.config.headless_timeout_secs),
        )
        .arg("--headless")
        .arg("--convert-to")
        .arg(format!("{extension}:{filter}"))
        .arg("--outdir")
        .arg(temp_dir)
        .arg(&artifact.path);

        if let Some(java_home) = &self.config.java_home {
            invocation = invocation
                .env("JAVA_HOME", java_home)
                .env("PATH", prepend_path(&java_home.join("bin")));
        }

        let output = invocation.run().await?;
        if !output.status.success() {
            // Non-zero exit with output on disk still counts; judged below.
            debug!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "headless engine exited non-zero"
            );
        }

        // The engine may return before its output file is flushed.
        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;

        let produced = find_by_extension(temp_dir, extension)?;
        let Some(produced) = produced else {
            if target == TargetFormat::Docx && artifact_is_pdf(artifact) {
                warn!(
                    input = %artifact.original_name,
                    "headless engine left no DOCX for a PDF input; requesting fallback"
                );
                return Ok(StrategyOutcome::FallbackRequested);
            }
            return Err(ConvertError::MissingEngineOutput {
                engine: ENGINE,
                extension,
            });
        };

        let base = sanitize_base_name(&artifact.original_name);
        let (dest, file_name) = self.store.allocate_output(&base, extension);
        self.store.move_into_output(&produced, &dest)?;

        let size_bytes = std::fs::metadata(&dest)
            .map_err(|source| ConvertError::OutputWriteFailed {
                path: dest.clone(),
                source,
            })?
            .len();

        Ok(StrategyOutcome::Converted(
            Converted::single(
                OutputArtifact {
                    path: dest,
                    file_name,
                    size_bytes,
                    page: None,
                },
                "LibreOffice headless conversion",
            )
            .with_quality("High quality, formatting preserved"),
        ))
    }
}

#[async_trait]
impl ConvertStrategy for HeadlessStrategy {
    fn name(&self) -> &'static str {
        ENGINE
    }

    async fn convert(
        &self,
        artifact: &Artifact,
        options: &ConvertOptions,
    ) -> Result<StrategyOutcome, ConvertError> {
        let target = options.target;
        let Some((extension, filter)) = export_filter(target) else {
            return Err(ConvertError::UnsupportedTarget {
                format: target.to_string(),
            });
        };

        let temp_dir = self.store.create_temp_dir()?;
        let result = self
            .convert_in_temp_dir(artifact, &temp_dir, extension, filter, target)
            .await;
        // The scratch directory goes away whether or not the engine
        // succeeded; cleanup failures never mask the result.
        self.store.remove_temp_dir(&temp_dir);
        result
    }
}

/// First file in `dir` carrying the wanted extension.
fn find_by_extension(
    dir: &Path,
    extension: &'static str,
) -> Result<Option<PathBuf>, ConvertError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ConvertError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn artifact_is_pdf(artifact: &Artifact) -> bool {
    artifact
        .extension()
        .is_some_and(|e| SourceKind::Pdf.matches_extension(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_filter_table_covers_document_targets() {
        assert_eq!(
            export_filter(TargetFormat::Pdf),
            Some(("pdf", "writer_pdf_Export"))
        );
        assert_eq!(
            export_filter(TargetFormat::Docx),
            Some(("docx", "Office Open XML Text"))
        );
        assert_eq!(export_filter(TargetFormat::Odt), Some(("odt", "writer8")));
        assert_eq!(export_filter(TargetFormat::Png), None);
    }

    #[test]
    fn extension_scan_ignores_case_and_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.log"), b"x").unwrap();
        std::fs::write(tmp.path().join("out.PDF"), b"%PDF").unwrap();
        let found = find_by_extension(tmp.path(), "pdf").unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "out.PDF");
    }

    #[test]
    fn extension_scan_yields_none_on_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_by_extension(tmp.path(), "docx").unwrap().is_none());
    }
}
