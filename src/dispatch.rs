//! Request dispatch: validate, resolve a plan, run the batch.
//!
//! [`ConversionEngine`] is the crate's front door. It owns the shared
//! configuration, the artifact store, and the strategy registry; every
//! conversion request flows through [`ConversionEngine::convert`].
//!
//! Validation errors (nothing uploaded, nothing of the declared kind, an
//! unsupported source/target pair) surface as `Err` before any engine
//! runs. Per-item conversion failures never do; they are recorded inside
//! the returned [`BatchResult`].

use crate::artifact::{Artifact, SourceKind, TargetFormat};
use crate::batch::BatchCoordinator;
use crate::config::{ConvertOptions, EngineConfig};
use crate::error::ConvertError;
use crate::outcome::BatchResult;
use crate::store::ArtifactStore;
use crate::strategy::StrategyRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// One inbound conversion request: a declared source kind, a target
/// format, and the uploaded artifacts.
#[derive(Debug)]
pub struct ConversionRequest {
    /// The kind of input the caller claims to be submitting. Items whose
    /// extension does not match are skipped (and their uploads consumed).
    pub source: SourceKind,
    /// The format every item should be converted to.
    pub target: TargetFormat,
    /// The uploaded artifacts, in submission order.
    pub items: Vec<Artifact>,
    /// Lossy-encoder quality, as sent. Out-of-range values fall back to
    /// the configured default.
    pub quality: Option<i64>,
}

impl ConversionRequest {
    pub fn new(source: SourceKind, target: TargetFormat, items: Vec<Artifact>) -> Self {
        Self {
            source,
            target,
            items,
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: i64) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// The conversion orchestrator.
///
/// Cheap to clone pieces are held behind `Arc`; one engine instance is
/// meant to serve a whole process.
pub struct ConversionEngine {
    config: Arc<EngineConfig>,
    store: Arc<ArtifactStore>,
    registry: StrategyRegistry,
}

impl ConversionEngine {
    /// Build an engine and create its working directories.
    pub fn new(config: EngineConfig) -> Result<Self, ConvertError> {
        let config = Arc::new(config);
        let store = Arc::new(ArtifactStore::new(
            &config.upload_root,
            &config.output_root,
            &config.temp_root,
        ));
        store.ensure_directories()?;
        let registry = StrategyRegistry::new(config.clone(), store.clone());
        Ok(Self {
            config,
            store,
            registry,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Convert a single artifact: a batch of one, unwrapped nowhere —
    /// the caller still gets the full [`BatchResult`] bookkeeping.
    pub async fn convert_one(
        &self,
        source: SourceKind,
        target: TargetFormat,
        artifact: Artifact,
    ) -> Result<BatchResult, ConvertError> {
        self.convert(ConversionRequest::new(source, target, vec![artifact]))
            .await
    }

    /// Validate and run one request.
    ///
    /// Only request-level validation errors surface as `Err`; once a
    /// batch starts, per-item failures are isolated inside the result.
    pub async fn convert(&self, request: ConversionRequest) -> Result<BatchResult, ConvertError> {
        if request.items.is_empty() {
            return Err(ConvertError::NoInput);
        }

        let (items, skipped): (Vec<_>, Vec<_>) = request
            .items
            .into_iter()
            .partition(|a| item_matches(a, request.source));

        // Skipped uploads are consumed too; nothing lingers in the
        // upload root.
        for artifact in &skipped {
            warn!(
                item = %artifact.original_name,
                expected = request.source.label(),
                "skipping item of the wrong kind"
            );
            self.store.delete_input(&artifact.path);
        }

        if items.is_empty() {
            return Err(ConvertError::NoMatchingInput {
                expected: request.source.label(),
            });
        }

        let Some(plan) = self.registry.resolve(request.source, request.target) else {
            return Err(ConvertError::UnsupportedConversion {
                from: request.source.label().to_string(),
                target: request.target.to_string(),
            });
        };

        info!(
            source = request.source.label(),
            target = %request.target,
            items = items.len(),
            strategy = plan.primary.name(),
            "dispatching conversion batch"
        );

        let mut options = ConvertOptions::new(request.target);
        options.quality = request.quality;

        let coordinator =
            BatchCoordinator::new(self.store.clone(), self.config.progress.clone());
        Ok(coordinator.run(&plan, items, &options).await)
    }
}

fn item_matches(artifact: &Artifact, source: SourceKind) -> bool {
    artifact
        .extension()
        .is_some_and(|e| source.matches_extension(&e))
}
