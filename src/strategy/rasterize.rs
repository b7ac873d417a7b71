//! PDF rasterisation strategy: every page → one image artifact.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not be driven from async contexts.
//! `tokio::task::spawn_blocking` moves the render onto the blocking pool
//! so the async workers never stall on CPU-heavy page rendering.
//!
//! Geometry is fixed at an A4 page scanned at 300 DPI (2480×3508): large
//! enough for print-quality extraction, bounded enough that a hundred-page
//! document cannot exhaust memory.

use crate::artifact::Artifact;
use crate::config::{ConvertOptions, EngineConfig};
use crate::error::ConvertError;
use crate::outcome::{Converted, OutputArtifact};
use crate::sanitize::sanitize_base_name;
use crate::store::ArtifactStore;
use crate::strategy::{ConvertStrategy, StrategyOutcome};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct RasterizeStrategy {
    config: Arc<EngineConfig>,
    store: Arc<ArtifactStore>,
}

impl RasterizeStrategy {
    pub fn new(config: Arc<EngineConfig>, store: Arc<ArtifactStore>) -> Self {
        Self { config, store }
    }
}

#[async_trait]
impl ConvertStrategy for RasterizeStrategy {
    fn name(&self) -> &'static str {
        "PDF rasteriser"
    }

    async fn convert(
        &self,
        artifact: &Artifact,
        options: &ConvertOptions,
    ) -> Result<StrategyOutcome, ConvertError> {
        let target = options.target;
        if !target.is_image() {
            return Err(ConvertError::UnsupportedTarget {
                format: target.to_string(),
            });
        }
        let quality = options.effective_quality(self.config.default_quality);

        let base = sanitize_base_name(&artifact.original_name);
        let token = self.store.new_token();

        // Reserve every page path up front; the blocking task writes them.
        let pdf_path = artifact.path.clone();
        let store = self.store.clone();
        let width = self.config.raster_width;
        let height = self.config.raster_height;
        let extension = target.extension();

        let outputs = tokio::task::spawn_blocking(move || {
            render_all_pages(
                &pdf_path, &store, &base, &token, extension, width, height, quality,
            )
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("render task panicked: {e}")))??;

        info!(
            pages = outputs.len(),
            "rasterised PDF into page images"
        );

        Ok(StrategyOutcome::Converted(Converted {
            outputs,
            method: "pdfium rasterisation",
            statistics: None,
            quality: None,
        }))
    }
}

/// Blocking render of all pages, in page order starting at 1.
#[allow(clippy::too_many_arguments)]
fn render_all_pages(
    pdf_path: &Path,
    store: &ArtifactStore,
    base: &str,
    token: &str,
    extension: &'static str,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<OutputArtifact>, ConvertError> {
    let pdfium = Pdfium::new(
        Pdfium::bind_to_system_library()
            .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{e:?}")))?,
    );

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ConvertError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    debug!(total, "PDF loaded for rasterisation");
    if total == 0 {
        // pdfium can open a damaged document and still report zero pages.
        return Err(ConvertError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: "document contains no pages".to_string(),
        });
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);

    let mut outputs = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let page_num = (idx + 1) as u32;
        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| ConvertError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                })?;
        let img = bitmap.as_image();

        let (dest, file_name) = store.allocate_page_output(base, token, page_num, extension);
        write_page(&img, &dest, extension, quality).map_err(|detail| {
            ConvertError::RasterisationFailed {
                page: idx + 1,
                detail,
            }
        })?;

        let size_bytes = std::fs::metadata(&dest)
            .map_err(|source| ConvertError::OutputWriteFailed {
                path: dest.clone(),
                source,
            })?
            .len();
        debug!(page = page_num, file = %file_name, size_bytes, "page rendered");

        outputs.push(OutputArtifact {
            path: dest,
            file_name,
            size_bytes,
            page: Some(page_num),
        });
    }

    Ok(outputs)
}

/// Encode one rendered page to disk.
fn write_page(
    img: &image::DynamicImage,
    dest: &PathBuf,
    extension: &str,
    quality: u8,
) -> Result<(), String> {
    if extension == "jpg" {
        // Page bitmaps carry an alpha channel pdfium always fills opaque;
        // JPEG needs it stripped.
        let file = File::create(dest).map_err(|e| e.to_string())?;
        let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(BufWriter::new(file), quality))
            .map_err(|e| e.to_string())
    } else {
        img.save(dest).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::TargetFormat;

    // Rendering needs a pdfium shared library; the full path is covered
    // by the env-gated integration tests. Here we pin down the parts that
    // do not touch pdfium.

    #[tokio::test]
    async fn document_target_is_rejected_without_binding_pdfium() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Arc::new(EngineConfig::default());
        let store = Arc::new(ArtifactStore::new(
            tmp.path().join("u"),
            tmp.path().join("c"),
            tmp.path().join("t"),
        ));
        let input = tmp.path().join("u");
        std::fs::create_dir_all(&input).unwrap();
        let pdf = input.join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 stub").unwrap();
        let artifact = Artifact::from_path(&pdf, "doc.pdf").unwrap();

        let strategy = RasterizeStrategy::new(config, store);
        let err = strategy
            .convert(&artifact, &ConvertOptions::new(TargetFormat::Docx))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
