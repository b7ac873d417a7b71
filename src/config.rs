//! Engine configuration.
//!
//! Every knob lives in [`EngineConfig`], built via [`EngineConfigBuilder`].
//! Keeping the whole surface in one struct makes it trivial to share
//! across requests and to diff two deployments when their behaviour
//! differs. Defaults reproduce the production layout: `uploads/`,
//! `converted/`, `temp-conversion/` next to the process.

use crate::batch::BatchProgress;
use crate::error::ConvertError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a [`crate::ConversionEngine`].
///
/// # Example
/// ```rust
/// use fileforge::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .output_root("converted")
///     .default_quality(85)
///     .headless_timeout_secs(45)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    /// Root for transient uploaded artifacts. Default: `uploads`.
    pub upload_root: PathBuf,

    /// Root for final converted artifacts, served for download. Default: `converted`.
    pub output_root: PathBuf,

    /// Root for per-invocation scratch directories. Default: `temp-conversion`.
    pub temp_root: PathBuf,

    /// LibreOffice binary. Default: `libreoffice`.
    ///
    /// Tests point this at a stand-in script; deployments may need the
    /// full path when the binary is not on `PATH`.
    pub headless_binary: PathBuf,

    /// Install root of the Java runtime LibreOffice depends on.
    ///
    /// Exported as `JAVA_HOME`, with its `bin/` prepended to `PATH`,
    /// because the managed runtime is not guaranteed to be on the default
    /// search path. `None` leaves the environment untouched.
    pub java_home: Option<PathBuf>,

    /// Hard wall-clock timeout for one LibreOffice invocation. Default: 45 s.
    pub headless_timeout_secs: u64,

    /// Pause after LibreOffice exits before scanning its output directory.
    /// Default: 2000 ms.
    ///
    /// The engine has been observed to return before its output file is
    /// flushed; scanning immediately finds an empty directory.
    pub settle_ms: u64,

    /// The pdf2docx wrapper script. Default: `pdf_converter.py`.
    pub reconstruct_script: PathBuf,

    /// Python virtualenv holding pdf2docx. Default: `venv`.
    ///
    /// When `<venv>/bin/python` exists it is preferred over the system
    /// interpreter, and `VIRTUAL_ENV`/`PATH` are set accordingly.
    pub reconstruct_venv: PathBuf,

    /// System interpreter used when the venv is absent. Default: `python3`.
    pub system_python: PathBuf,

    /// Hard wall-clock timeout for one reconstruction invocation. Default: 60 s.
    pub reconstruct_timeout_secs: u64,

    /// Rasterisation target width in pixels. Default: 2480 (A4 at 300 DPI).
    pub raster_width: u32,

    /// Rasterisation maximum height in pixels. Default: 3508 (A4 at 300 DPI).
    pub raster_height: u32,

    /// Quality used when the request omits it or supplies garbage.
    /// Range 1–100. Default: 90.
    pub default_quality: u8,

    /// Per-item progress notifications, used by the CLI. Default: none.
    pub progress: Option<Arc<dyn BatchProgress>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("uploads"),
            output_root: PathBuf::from("converted"),
            temp_root: PathBuf::from("temp-conversion"),
            headless_binary: PathBuf::from("libreoffice"),
            java_home: Some(PathBuf::from("/usr/lib/jvm/java-24-openjdk")),
            headless_timeout_secs: 45,
            settle_ms: 2000,
            reconstruct_script: PathBuf::from("pdf_converter.py"),
            reconstruct_venv: PathBuf::from("venv"),
            system_python: PathBuf::from("python3"),
            reconstruct_timeout_secs: 60,
            raster_width: 2480,
            raster_height: 3508,
            default_quality: 90,
            progress: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("upload_root", &self.upload_root)
            .field("output_root", &self.output_root)
            .field("temp_root", &self.temp_root)
            .field("headless_binary", &self.headless_binary)
            .field("java_home", &self.java_home)
            .field("headless_timeout_secs", &self.headless_timeout_secs)
            .field("settle_ms", &self.settle_ms)
            .field("reconstruct_script", &self.reconstruct_script)
            .field("reconstruct_venv", &self.reconstruct_venv)
            .field("reconstruct_timeout_secs", &self.reconstruct_timeout_secs)
            .field("raster_width", &self.raster_width)
            .field("raster_height", &self.raster_height)
            .field("default_quality", &self.default_quality)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn BatchProgress>"))
            .finish()
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn upload_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.upload_root = path.into();
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn temp_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.temp_root = path.into();
        self
    }

    pub fn headless_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.headless_binary = path.into();
        self
    }

    pub fn java_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.java_home = Some(path.into());
        self
    }

    pub fn no_java_home(mut self) -> Self {
        self.config.java_home = None;
        self
    }

    pub fn headless_timeout_secs(mut self, secs: u64) -> Self {
        self.config.headless_timeout_secs = secs.max(1);
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.settle_ms = ms;
        self
    }

    pub fn reconstruct_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.reconstruct_script = path.into();
        self
    }

    pub fn reconstruct_venv(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.reconstruct_venv = path.into();
        self
    }

    pub fn system_python(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.system_python = path.into();
        self
    }

    pub fn reconstruct_timeout_secs(mut self, secs: u64) -> Self {
        self.config.reconstruct_timeout_secs = secs.max(1);
        self
    }

    pub fn raster_size(mut self, width: u32, height: u32) -> Self {
        self.config.raster_width = width.max(1);
        self.config.raster_height = height.max(1);
        self
    }

    pub fn default_quality(mut self, quality: u8) -> Self {
        self.config.default_quality = quality.clamp(1, 100);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn BatchProgress>) -> Self {
        self.config.progress = Some(progress);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, ConvertError> {
        let c = &self.config;
        if c.default_quality == 0 || c.default_quality > 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "default quality must be 1–100, got {}",
                c.default_quality
            )));
        }
        if c.upload_root == c.output_root || c.upload_root == c.temp_root {
            return Err(ConvertError::InvalidConfig(
                "upload root must not coincide with output or temp root".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Per-request options carried alongside the target format.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// The format to produce.
    pub target: crate::artifact::TargetFormat,
    /// Lossy-encoder quality as the client sent it, unvalidated.
    pub quality: Option<i64>,
}

impl ConvertOptions {
    pub fn new(target: crate::artifact::TargetFormat) -> Self {
        Self {
            target,
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: i64) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Resolve the effective quality: 1–100 passes through, anything
    /// absent or out of range falls back to the configured default.
    pub fn effective_quality(&self, default_quality: u8) -> u8 {
        match self.quality {
            Some(q) if (1..=100).contains(&q) => q as u8,
            _ => default_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::TargetFormat;

    #[test]
    fn builder_clamps_quality() {
        let config = EngineConfig::builder().default_quality(250).build().unwrap();
        assert_eq!(config.default_quality, 100);
    }

    #[test]
    fn builder_rejects_coinciding_roots() {
        let err = EngineConfig::builder()
            .upload_root("data")
            .output_root("data")
            .build()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn effective_quality_falls_back_on_garbage() {
        let opts = ConvertOptions::new(TargetFormat::Jpeg);
        assert_eq!(opts.effective_quality(90), 90);

        let opts = ConvertOptions::new(TargetFormat::Jpeg).with_quality(0);
        assert_eq!(opts.effective_quality(90), 90);

        let opts = ConvertOptions::new(TargetFormat::Jpeg).with_quality(101);
        assert_eq!(opts.effective_quality(90), 90);

        let opts = ConvertOptions::new(TargetFormat::Jpeg).with_quality(-5);
        assert_eq!(opts.effective_quality(90), 90);

        let opts = ConvertOptions::new(TargetFormat::Jpeg).with_quality(10);
        assert_eq!(opts.effective_quality(90), 10);
    }
}
