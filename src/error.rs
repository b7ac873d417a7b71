//! Error types for the fileforge engine.
//!
//! The taxonomy mirrors how failures surface to callers:
//!
//! * **Validation** — the request itself is wrong (no input of the expected
//!   kind, unsupported source/target pair). Surfaced before any engine is
//!   invoked.
//!
//! * **Conversion** — an engine ran and failed (timeout, non-zero exit,
//!   missing or malformed output). Inside a batch these become recorded
//!   failure entries rather than an aborted batch.
//!
//! Fallback hand-off between strategies is deliberately *not* an error:
//! it is a [`crate::strategy::StrategyOutcome`] variant, so nobody has to
//! sniff error-message substrings to detect it.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by the transport layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request-level problem; no engine was invoked.
    Validation,
    /// An engine invocation or filesystem step failed.
    Conversion,
}

/// All errors returned by the fileforge library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The request carried no input artifacts at all.
    #[error("No files were uploaded for conversion")]
    NoInput,

    /// None of the uploaded artifacts matches the kind the request expects.
    #[error("No {expected} file found among the uploaded files")]
    NoMatchingInput { expected: &'static str },

    /// The (source kind, target format) pair has no registered strategy.
    ///
    /// The field is `from`, not `source`: thiserror reserves `source` for
    /// a chained error cause.
    #[error("Unsupported conversion: {from} → {target}")]
    UnsupportedConversion { from: String, target: String },

    /// The requested target format string is not recognised at all.
    #[error("Unsupported target format: '{format}'")]
    UnsupportedTarget { format: String },

    // ── Image engine errors ───────────────────────────────────────────────
    /// The input could not be decoded as a raster image.
    #[error("Failed to read image '{path}': {detail}\nEnsure the file is a valid raster image.")]
    ImageReadFailed { path: PathBuf, detail: String },

    /// Re-encoding to the target format failed.
    #[error("Failed to encode image as {format}: {detail}")]
    ImageEncodeFailed { format: String, detail: String },

    // ── PDF engine errors ─────────────────────────────────────────────────
    /// Could not bind to a pdfium library at runtime.
    #[error(
        "Failed to bind to the pdfium library: {0}\n\
         Install pdfium or set PDFIUM_DYNAMIC_LIB_PATH to an existing copy."
    )]
    PdfiumBindingFailed(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}\nEnsure the document is not corrupted or password-protected.")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Subprocess engine errors ──────────────────────────────────────────
    /// The engine exceeded its wall-clock timeout and was killed.
    #[error("{engine} did not finish within {secs}s and was terminated")]
    EngineTimeout { engine: &'static str, secs: u64 },

    /// The engine process could not be spawned or exited abnormally.
    #[error("{engine} failed: {detail}\nEnsure the document is not corrupted or password-protected.")]
    EngineFailed { engine: &'static str, detail: String },

    /// The engine exited cleanly but left no file with the expected extension.
    #[error("{engine} produced no .{extension} output file")]
    MissingEngineOutput {
        engine: &'static str,
        extension: &'static str,
    },

    /// The engine emitted nothing on its result stream — a deployment
    /// problem, not a per-document one.
    #[error(
        "{engine} returned no result.\n\
         Check that the converter and its interpreter environment are installed."
    )]
    EmptyEngineOutput { engine: &'static str },

    /// The engine's result stream was not a valid result record.
    #[error("{engine} returned an unparsable result: {source}")]
    MalformedEngineOutput {
        engine: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The engine ran, produced a result record, and reported failure.
    #[error("{engine} reported: {message}")]
    EngineReported {
        engine: &'static str,
        message: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create a scratch directory or move a finished artifact.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Classify this error for the transport layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::NoInput
            | ConvertError::NoMatchingInput { .. }
            | ConvertError::UnsupportedConversion { .. }
            | ConvertError::UnsupportedTarget { .. }
            | ConvertError::InvalidConfig(_) => ErrorKind::Validation,
            _ => ErrorKind::Conversion,
        }
    }

    /// True if this error means the request never reached an engine.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_classify_as_validation() {
        assert!(ConvertError::NoInput.is_validation());
        assert!(ConvertError::UnsupportedTarget {
            format: "xyz".into()
        }
        .is_validation());
        assert!(ConvertError::NoMatchingInput { expected: "PDF" }.is_validation());
    }

    #[test]
    fn unsupported_conversion_names_both_sides() {
        let e = ConvertError::UnsupportedConversion {
            from: "image".into(),
            target: "docx".into(),
        };
        assert!(e.is_validation());
        assert_eq!(e.to_string(), "Unsupported conversion: image → docx");
    }

    #[test]
    fn engine_errors_classify_as_conversion() {
        let e = ConvertError::EngineTimeout {
            engine: "LibreOffice",
            secs: 45,
        };
        assert_eq!(e.kind(), ErrorKind::Conversion);
        assert!(e.to_string().contains("45s"));
    }

    #[test]
    fn engine_failed_carries_remediation_hint() {
        let e = ConvertError::EngineFailed {
            engine: "LibreOffice",
            detail: "exit code 1".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("corrupted or password-protected"), "got: {msg}");
    }
}
