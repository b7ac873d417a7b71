//! Image re-encode strategy: raster → raster, in process.
//!
//! The only strategy with no subprocess: decoding and re-encoding happen
//! through the `image` crate on a blocking thread. Quality applies to the
//! lossy encoders (JPEG, AVIF); PNG is always lossless and WebP is
//! encoded losslessly — the parameter is accepted and ignored there, as
//! callers expect from the original service.

use crate::artifact::{Artifact, TargetFormat};
use crate::config::{ConvertOptions, EngineConfig};
use crate::error::ConvertError;
use crate::outcome::{Converted, OutputArtifact};
use crate::sanitize::sanitize_base_name;
use crate::store::ArtifactStore;
use crate::strategy::{ConvertStrategy, StrategyOutcome};
use async_trait::async_trait;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// AVIF encode speed: 1 (slow, best) … 10 (fast). 4 balances latency
/// against compression for interactive use.
const AVIF_SPEED: u8 = 4;

pub struct ImageEncodeStrategy {
    config: Arc<EngineConfig>,
    store: Arc<ArtifactStore>,
}

impl ImageEncodeStrategy {
    pub fn new(config: Arc<EngineConfig>, store: Arc<ArtifactStore>) -> Self {
        Self { config, store }
    }
}

#[async_trait]
impl ConvertStrategy for ImageEncodeStrategy {
    fn name(&self) -> &'static str {
        "image encoder"
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
        let (dest, file_name) = self.store.allocate_output(&base, target.extension());

        let input = artifact.path.clone();
        let dest_clone = dest.clone();
        // Decode + encode are CPU-bound; keep them off the async workers.
        tokio::task::spawn_blocking(move || encode_file(&input, &dest_clone, target, quality))
            .await
            .map_err(|e| ConvertError::Internal(format!("encode task panicked: {e}")))??;

        let size_bytes = std::fs::metadata(&dest)
            .map_err(|source| ConvertError::OutputWriteFailed {
                path: dest.clone(),
                source,
            })?
            .len();
        debug!(
            file = %file_name,
            quality,
            size_bytes,
            "image re-encoded"
        );

        Ok(StrategyOutcome::Converted(Converted::single(
            OutputArtifact {
                path: dest,
                file_name,
                size_bytes,
                page: None,
            },
            "in-process image encoder",
        )))
    }
}

/// Blocking decode-and-encode of one file.
fn encode_file(
    input: &Path,
    dest: &PathBuf,
    target: TargetFormat,
    quality: u8,
) -> Result<(), ConvertError> {
    let img = image::open(input).map_err(|e| ConvertError::ImageReadFailed {
        path: input.to_path_buf(),
        detail: e.to_string(),
    })?;

    let file = File::create(dest).map_err(|source| ConvertError::OutputWriteFailed {
        path: dest.clone(),
        source,
    })?;
    let writer = BufWriter::new(file);

    let encode_err = |e: image::ImageError| ConvertError::ImageEncodeFailed {
        format: target.to_string(),
        detail: e.to_string(),
    };

    match target {
        TargetFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))
                .map_err(encode_err)?;
        }
        TargetFormat::Png => {
            img.write_with_encoder(PngEncoder::new(writer)).map_err(encode_err)?;
        }
        TargetFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(writer))
                .map_err(encode_err)?;
        }
        TargetFormat::Avif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(AvifEncoder::new_with_speed_quality(
                writer, AVIF_SPEED, quality,
            ))
            .map_err(encode_err)?;
        }
        _ => unreachable!("non-image targets rejected above"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn noisy_test_image(path: &Path) {
        // Deterministic high-frequency content so lossy quality levels
        // actually change the output size.
        let img = RgbImage::from_fn(160, 120, |x, y| {
            Rgb([
                ((x * 7 + y * 13) % 256) as u8,
                ((x * 31 ^ y * 17) % 256) as u8,
                ((x * 3 + y * 5) % 251) as u8,
            ])
        });
        img.save(path).unwrap();
    }

    fn fixture(dir: &Path) -> (Arc<EngineConfig>, Arc<ArtifactStore>, Artifact) {
        let config = Arc::new(
            EngineConfig::builder()
                .upload_root(dir.join("uploads"))
                .output_root(dir.join("converted"))
                .temp_root(dir.join("temp"))
                .build()
                .unwrap(),
        );
        let store = Arc::new(ArtifactStore::new(
            &config.upload_root,
            &config.output_root,
            &config.temp_root,
        ));
        store.ensure_directories().unwrap();

        let input = store.upload_root().join("source.png");
        noisy_test_image(&input);
        let artifact = Artifact::from_path(&input, "my photo.png").unwrap();
        (config, store, artifact)
    }

    async fn encode(
        config: Arc<EngineConfig>,
        store: Arc<ArtifactStore>,
        artifact: &Artifact,
        options: ConvertOptions,
    ) -> Converted {
        let strategy = ImageEncodeStrategy::new(config, store);
        match strategy.convert(artifact, &options).await.unwrap() {
            StrategyOutcome::Converted(c) => c,
            StrategyOutcome::FallbackRequested => panic!("image encode never falls back"),
        }
    }

    #[tokio::test]
    async fn png_to_jpeg_produces_output_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, store, artifact) = fixture(tmp.path());

        let converted = encode(
            config,
            store,
            &artifact,
            ConvertOptions::new(TargetFormat::Jpeg),
        )
        .await;

        let out = converted.primary();
        assert!(out.path.is_file());
        assert!(out.file_name.starts_with("my_photo_"));
        assert!(out.file_name.ends_with("_converted.jpg"));
        assert!(out.size_bytes > 0);
    }

    #[tokio::test]
    async fn lower_quality_produces_strictly_smaller_jpeg() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, store, artifact) = fixture(tmp.path());

        let low = encode(
            config.clone(),
            store.clone(),
            &artifact,
            ConvertOptions::new(TargetFormat::Jpeg).with_quality(10),
        )
        .await;
        let high = encode(
            config,
            store,
            &artifact,
            ConvertOptions::new(TargetFormat::Jpeg).with_quality(95),
        )
        .await;

        assert!(
            low.primary().size_bytes < high.primary().size_bytes,
            "q10 ({}) must be smaller than q95 ({})",
            low.primary().size_bytes,
            high.primary().size_bytes
        );
    }

    #[tokio::test]
    async fn unreadable_input_fails_with_image_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, store, _) = fixture(tmp.path());

        let bogus = store.upload_root().join("not_an_image.png");
        std::fs::write(&bogus, b"plain text").unwrap();
        let artifact = Artifact::from_path(&bogus, "not_an_image.png").unwrap();

        let strategy = ImageEncodeStrategy::new(config, store);
        let err = strategy
            .convert(&artifact, &ConvertOptions::new(TargetFormat::Png))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::ImageReadFailed { .. }));
    }

    #[tokio::test]
    async fn document_target_is_rejected_before_any_work() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, store, artifact) = fixture(tmp.path());

        let strategy = ImageEncodeStrategy::new(config, store);
        let err = strategy
            .convert(&artifact, &ConvertOptions::new(TargetFormat::Docx))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
