//! Result types: what a strategy produced and how a batch went.
//!
//! These types serialize with camelCase field names because they are the
//! exact payloads the HTTP layer returns to the browser; keeping the wire
//! shape here means the transport stays a dumb pass-through.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One file written into the output root.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutputArtifact {
    /// Absolute or root-relative location on disk.
    pub path: PathBuf,
    /// Name inside the output root; unique per conversion.
    pub file_name: String,
    /// Size in bytes after conversion.
    pub size_bytes: u64,
    /// Page number for multi-page conversions, 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// What one successful strategy invocation produced.
///
/// Rasterisation yields one output per page, in page order starting at 1;
/// every other strategy yields exactly one output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Converted {
    pub outputs: Vec<OutputArtifact>,
    /// Human-readable engine description, e.g. "pdf2docx reconstruction".
    pub method: &'static str,
    /// Reported by the high-fidelity engine only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ReconstructionStats>,
    /// Human-readable fidelity description for the document engines,
    /// e.g. "High-quality PDF to DOCX conversion".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl Converted {
    /// Single-output constructor for the non-paged strategies.
    pub fn single(output: OutputArtifact, method: &'static str) -> Self {
        Self {
            outputs: vec![output],
            method,
            statistics: None,
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// The first output. Every strategy guarantees at least one.
    pub fn primary(&self) -> &OutputArtifact {
        &self.outputs[0]
    }
}

/// Statistics reported by the high-fidelity PDF reconstruction engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ReconstructionStats {
    #[serde(default)]
    pub total_pages: PageCount,
    #[serde(default)]
    pub converted_pages: PageCount,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub preserves: Vec<String>,
    /// Size of the produced file, echoed from the engine when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A page count as the engine reports it.
///
/// The engine emits a number when it could open the source PDF and the
/// literal string `"Unknown"` when it could not; both are valid results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PageCount {
    Known(u64),
    Text(String),
}

impl Default for PageCount {
    fn default() -> Self {
        PageCount::Text("Unknown".to_string())
    }
}

impl PageCount {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PageCount::Known(n) => Some(*n),
            PageCount::Text(_) => None,
        }
    }
}

impl fmt::Display for PageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCount::Known(n) => write!(f, "{n}"),
            PageCount::Text(s) => f.write_str(s),
        }
    }
}

/// One converted item, shaped for the outbound single-item result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSuccess {
    pub success: bool,
    pub original_name: String,
    pub filename: String,
    pub download_path: String,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_method: Option<&'static str>,
    /// Fidelity description from the document engines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ReconstructionStats>,
    /// Per-page downloads for rasterised PDFs; empty otherwise.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageDownload>,
}

/// One rasterised page, 1-based.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageDownload {
    pub page: u32,
    pub download_path: String,
}

/// One failed item: the original name plus a human-readable message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub original_name: String,
    pub error: String,
}

/// Aggregated result of a batch (a single-item request is a batch of 1).
///
/// Invariant: `converted + failed == total`, always.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub results: Vec<ItemSuccess>,
    pub errors: Vec<ItemFailure>,
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn new(results: Vec<ItemSuccess>, errors: Vec<ItemFailure>, total: usize) -> Self {
        let converted = results.len();
        let failed = errors.len();
        debug_assert_eq!(converted + failed, total);
        Self {
            success: true,
            results,
            errors,
            total,
            converted,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_parses_both_shapes() {
        let known: PageCount = serde_json::from_str("7").unwrap();
        assert_eq!(known.as_u64(), Some(7));

        let unknown: PageCount = serde_json::from_str("\"Unknown\"").unwrap();
        assert_eq!(unknown.as_u64(), None);
        assert_eq!(unknown.to_string(), "Unknown");
    }

    #[test]
    fn reconstruction_stats_tolerate_missing_fields() {
        let stats: ReconstructionStats = serde_json::from_str("{}").unwrap();
        assert_eq!(stats.total_pages.as_u64(), None);
        assert!(stats.preserves.is_empty());
    }

    #[test]
    fn batch_result_counts_always_sum_to_total() {
        let ok = ItemSuccess {
            success: true,
            original_name: "a.png".into(),
            filename: "a_converted.webp".into(),
            download_path: "/converted/a_converted.webp".into(),
            file_size: 10,
            conversion_method: None,
            quality: None,
            statistics: None,
            pages: Vec::new(),
        };
        let err = ItemFailure {
            original_name: "b.png".into(),
            error: "boom".into(),
        };
        let batch = BatchResult::new(vec![ok], vec![err], 2);
        assert_eq!(batch.converted + batch.failed, batch.total);
    }

    #[test]
    fn item_success_serialises_camel_case() {
        let ok = ItemSuccess {
            success: true,
            original_name: "отчет.pdf".into(),
            filename: "отчет_converted.docx".into(),
            download_path: "/converted/отчет_converted.docx".into(),
            file_size: 42,
            conversion_method: Some("pdf2docx reconstruction"),
            quality: Some("High-quality PDF to DOCX conversion".to_string()),
            statistics: None,
            pages: Vec::new(),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["originalName"], "отчет.pdf");
        assert_eq!(json["downloadPath"], "/converted/отчет_converted.docx");
        assert_eq!(json["conversionMethod"], "pdf2docx reconstruction");
        assert_eq!(json["quality"], "High-quality PDF to DOCX conversion");
    }
}
