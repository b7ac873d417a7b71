//! Conversion strategies and their registry.
//!
//! A strategy is one way of turning an input artifact into output
//! artifacts. Each submodule owns exactly one engine:
//!
//! 1. [`image`]       — in-process raster re-encode (`image` crate)
//! 2. [`rasterize`]   — PDF pages → images (`pdfium-render`, `spawn_blocking`)
//! 3. [`headless`]    — document round-trips via a LibreOffice subprocess
//! 4. [`reconstruct`] — high-fidelity PDF → DOCX via the pdf2docx subprocess
//!
//! The registry maps `(source kind, target format)` to a
//! [`ConversionPlan`]; adding a format means registering a new arm here,
//! not growing a conditional chain somewhere else.

pub mod headless;
pub mod image;
pub mod invoke;
pub mod rasterize;
pub mod reconstruct;

use crate::artifact::{Artifact, SourceKind, TargetFormat};
use crate::config::{ConvertOptions, EngineConfig};
use crate::error::ConvertError;
use crate::outcome::Converted;
use crate::store::ArtifactStore;
use async_trait::async_trait;
use std::sync::Arc;

/// What a strategy invocation produced.
#[derive(Debug)]
pub enum StrategyOutcome {
    /// The engine produced output artifacts.
    Converted(Converted),
    /// The engine declined this item and another strategy should retry it.
    ///
    /// Emitted by the headless engine when a PDF→document conversion
    /// leaves no output; the dispatcher retries via the high-fidelity
    /// strategy. Internal-only — callers never see this variant.
    FallbackRequested,
}

/// A polymorphic conversion behaviour selected by source/target pair.
#[async_trait]
pub trait ConvertStrategy: Send + Sync {
    /// Short engine name for logs and failure messages.
    fn name(&self) -> &'static str;

    /// Convert one artifact. Must leave no scratch state behind on any
    /// path; the input artifact itself is the batch coordinator's to
    /// delete.
    async fn convert(
        &self,
        artifact: &Artifact,
        options: &ConvertOptions,
    ) -> Result<StrategyOutcome, ConvertError>;
}

/// The strategy (plus optional fallback) chosen for one request.
#[derive(Clone)]
pub struct ConversionPlan {
    pub primary: Arc<dyn ConvertStrategy>,
    /// Retried per item when the primary returns
    /// [`StrategyOutcome::FallbackRequested`].
    pub fallback: Option<Arc<dyn ConvertStrategy>>,
}

/// Resolves `(source kind, target format)` pairs to conversion plans.
pub struct StrategyRegistry {
    image: Arc<image::ImageEncodeStrategy>,
    rasterize: Arc<rasterize::RasterizeStrategy>,
    headless: Arc<headless::HeadlessStrategy>,
    reconstruct: Arc<reconstruct::ReconstructStrategy>,
}

impl StrategyRegistry {
    pub fn new(config: Arc<EngineConfig>, store: Arc<ArtifactStore>) -> Self {
        Self {
            image: Arc::new(image::ImageEncodeStrategy::new(
                config.clone(),
                store.clone(),
            )),
            rasterize: Arc::new(rasterize::RasterizeStrategy::new(
                config.clone(),
                store.clone(),
            )),
            headless: Arc::new(headless::HeadlessStrategy::new(
                config.clone(),
                store.clone(),
            )),
            reconstruct: Arc::new(reconstruct::ReconstructStrategy::new(config, store)),
        }
    }

    /// Select the plan for a request, or `None` when the pair is
    /// unsupported.
    pub fn resolve(&self, source: SourceKind, target: TargetFormat) -> Option<ConversionPlan> {
        match (source, target) {
            (SourceKind::RasterImage, t) if t.is_image() => Some(ConversionPlan {
                primary: self.image.clone(),
                fallback: None,
            }),
            (SourceKind::Pdf, t) if t.is_image() => Some(ConversionPlan {
                primary: self.rasterize.clone(),
                fallback: None,
            }),
            // PDF→DOCX goes straight to the high-fidelity engine; the
            // headless engine is unreliable for text reconstruction.
            (SourceKind::Pdf, TargetFormat::Docx) => Some(ConversionPlan {
                primary: self.reconstruct.clone(),
                fallback: None,
            }),
            (SourceKind::Document, t) if t.is_document() => Some(ConversionPlan {
                primary: self.headless.clone(),
                // A PDF that lands in a document batch targeting DOCX can
                // still be rescued by the high-fidelity engine.
                fallback: (t == TargetFormat::Docx).then(|| {
                    self.reconstruct.clone() as Arc<dyn ConvertStrategy>
                }),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StrategyRegistry {
        let config = Arc::new(EngineConfig::default());
        let store = Arc::new(ArtifactStore::new(
            &config.upload_root,
            &config.output_root,
            &config.temp_root,
        ));
        StrategyRegistry::new(config, store)
    }

    #[test]
    fn resolves_the_four_strategies() {
        let r = registry();
        assert_eq!(
            r.resolve(SourceKind::RasterImage, TargetFormat::Webp)
                .unwrap()
                .primary
                .name(),
            "image encoder"
        );
        assert_eq!(
            r.resolve(SourceKind::Pdf, TargetFormat::Png)
                .unwrap()
                .primary
                .name(),
            "PDF rasteriser"
        );
        assert_eq!(
            r.resolve(SourceKind::Document, TargetFormat::Pdf)
                .unwrap()
                .primary
                .name(),
            "LibreOffice"
        );
        assert_eq!(
            r.resolve(SourceKind::Pdf, TargetFormat::Docx)
                .unwrap()
                .primary
                .name(),
            "pdf2docx"
        );
    }

    #[test]
    fn document_to_docx_carries_fallback() {
        let r = registry();
        let plan = r.resolve(SourceKind::Document, TargetFormat::Docx).unwrap();
        assert_eq!(plan.primary.name(), "LibreOffice");
        assert_eq!(plan.fallback.as_ref().unwrap().name(), "pdf2docx");

        let plan = r.resolve(SourceKind::Document, TargetFormat::Pdf).unwrap();
        assert!(plan.fallback.is_none());
    }

    #[test]
    fn unsupported_pairs_resolve_to_none() {
        let r = registry();
        assert!(r.resolve(SourceKind::RasterImage, TargetFormat::Docx).is_none());
        assert!(r.resolve(SourceKind::Document, TargetFormat::Png).is_none());
        assert!(r.resolve(SourceKind::Pdf, TargetFormat::Odt).is_none());
    }
}
