//! Input artifacts and the format vocabulary of the engine.
//!
//! An [`Artifact`] is an uploaded file together with its provenance: the
//! name the user gave it and its size. The upload boundary creates it; the
//! engine owns it exclusively for the duration of one request and deletes
//! it on every exit path — see [`crate::batch`].

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// An uploaded file tracked for the duration of one conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Location on disk, inside the upload root.
    pub path: PathBuf,
    /// The filename as the user supplied it. May be mojibake — see
    /// [`crate::sanitize`].
    pub original_name: String,
    /// Size in bytes as reported at upload time.
    pub size_bytes: u64,
}

impl Artifact {
    /// Build an artifact from a file already on disk, reading its size.
    pub fn from_path(path: impl Into<PathBuf>, original_name: impl Into<String>) -> std::io::Result<Self> {
        let path = path.into();
        let size_bytes = std::fs::metadata(&path)?.len();
        Ok(Self {
            path,
            original_name: original_name.into(),
            size_bytes,
        })
    }

    /// Lower-cased extension of the *stored* file, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

/// The broad kind of input a strategy accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Raster images: jpeg/png/gif/bmp/tiff/webp/avif.
    RasterImage,
    /// PDF documents.
    Pdf,
    /// Word-processor documents: doc/docx/odt/rtf, plus PDFs submitted
    /// for document-to-document conversion.
    Document,
}

impl SourceKind {
    /// Human label used in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::RasterImage => "image",
            SourceKind::Pdf => "PDF",
            SourceKind::Document => "document",
        }
    }

    /// Whether a file with this extension plausibly belongs to the kind.
    ///
    /// This is admission by extension, matching what the upload boundary
    /// already filtered on; engines still fail cleanly on lying files.
    pub fn matches_extension(self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        match self {
            SourceKind::RasterImage => matches!(
                ext.as_str(),
                "jpeg" | "jpg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp" | "avif"
            ),
            SourceKind::Pdf => ext == "pdf",
            SourceKind::Document => {
                matches!(ext.as_str(), "doc" | "docx" | "odt" | "rtf" | "pdf")
            }
        }
    }

    /// Classify a path by extension, if it maps to a known kind.
    pub fn of_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        [SourceKind::Pdf, SourceKind::RasterImage, SourceKind::Document]
            .into_iter()
            .find(|k| k.matches_extension(&ext))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every output format the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
    Pdf,
    Docx,
    Odt,
}

impl TargetFormat {
    /// The file extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
            TargetFormat::Avif => "avif",
            TargetFormat::Pdf => "pdf",
            TargetFormat::Docx => "docx",
            TargetFormat::Odt => "odt",
        }
    }

    /// True for the raster-image targets.
    pub fn is_image(self) -> bool {
        matches!(
            self,
            TargetFormat::Jpeg | TargetFormat::Png | TargetFormat::Webp | TargetFormat::Avif
        )
    }

    /// True for the document targets (the headless engine's table).
    pub fn is_document(self) -> bool {
        matches!(self, TargetFormat::Pdf | TargetFormat::Docx | TargetFormat::Odt)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            "png" => Ok(TargetFormat::Png),
            "webp" => Ok(TargetFormat::Webp),
            "avif" => Ok(TargetFormat::Avif),
            "pdf" => Ok(TargetFormat::Pdf),
            "docx" => Ok(TargetFormat::Docx),
            "odt" => Ok(TargetFormat::Odt),
            other => Err(ConvertError::UnsupportedTarget {
                format: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_parses_aliases() {
        assert_eq!("jpg".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!("JPEG".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!("odt".parse::<TargetFormat>().unwrap(), TargetFormat::Odt);
        assert!("exe".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn source_kind_matches_extensions() {
        assert!(SourceKind::RasterImage.matches_extension("PNG"));
        assert!(SourceKind::Pdf.matches_extension("pdf"));
        assert!(!SourceKind::Pdf.matches_extension("docx"));
        assert!(SourceKind::Document.matches_extension("odt"));
    }

    #[test]
    fn source_kind_of_path_prefers_exact_kind() {
        assert_eq!(
            SourceKind::of_path(Path::new("a/b/report.pdf")),
            Some(SourceKind::Pdf)
        );
        assert_eq!(
            SourceKind::of_path(Path::new("photo.JPG")),
            Some(SourceKind::RasterImage)
        );
        assert_eq!(SourceKind::of_path(Path::new("noext")), None);
    }
}
