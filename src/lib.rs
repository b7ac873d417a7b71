//! # fileforge
//!
//! A file-conversion orchestration engine: images, PDFs, and office
//! documents in; converted artifacts out. One library crate drives four
//! conversion engines behind a single strategy interface:
//!
//! * **in-process image re-encode** — JPEG/PNG/WebP/AVIF via the `image`
//!   crate, with lossy quality control;
//! * **PDF rasterisation** — every page to a print-quality image via
//!   `pdfium-render`;
//! * **headless LibreOffice** — document round-trips (DOC/DOCX/ODT/RTF →
//!   PDF/DOCX/ODT) through a supervised subprocess;
//! * **pdf2docx reconstruction** — high-fidelity PDF → DOCX through a
//!   Python subprocess speaking a one-record JSON protocol on stdout.
//!
//! The engine is batch-first: every request is a batch (a single file is
//! a batch of one), items run strictly sequentially, one item's failure
//! never aborts the rest, and every uploaded input is deleted once its
//! item finishes — on success and on failure alike.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fileforge::{Artifact, ConversionEngine, EngineConfig, SourceKind, TargetFormat};
//!
//! # async fn run() -> Result<(), fileforge::ConvertError> {
//! let engine = ConversionEngine::new(EngineConfig::default())?;
//!
//! let artifact = Artifact::from_path("uploads/photo.png", "photo.png")
//!     .map_err(|e| fileforge::ConvertError::Internal(e.to_string()))?;
//! let batch = engine
//!     .convert_one(SourceKind::RasterImage, TargetFormat::Webp, artifact)
//!     .await?;
//!
//! for item in &batch.results {
//!     println!("{} -> {}", item.original_name, item.download_path);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## External engines
//!
//! The LibreOffice and pdf2docx strategies shell out; both are supervised
//! the same way: hard wall-clock deadline, child killed past it, scratch
//! directories cleaned up on every path. See [`EngineConfig`] for the
//! binary paths, timeouts, and environment knobs.

pub mod artifact;
pub mod batch;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod sanitize;
pub mod store;
pub mod strategy;

pub use artifact::{Artifact, SourceKind, TargetFormat};
pub use batch::{BatchCoordinator, BatchProgress};
pub use config::{ConvertOptions, EngineConfig, EngineConfigBuilder};
pub use dispatch::{ConversionEngine, ConversionRequest};
pub use error::{ConvertError, ErrorKind};
pub use outcome::{
    BatchResult, Converted, ItemFailure, ItemSuccess, OutputArtifact, PageCount, PageDownload,
    ReconstructionStats,
};
pub use sanitize::{repair_encoding, sanitize_base_name};
pub use store::ArtifactStore;
pub use strategy::{ConversionPlan, ConvertStrategy, StrategyOutcome, StrategyRegistry};
