//! Batch coordination: run one strategy over many artifacts.
//!
//! Items run strictly sequentially. The external engines are heavyweight
//! and were never designed for invocation concurrency; one-at-a-time is
//! the backpressure mechanism, not a limitation to optimise away.
//!
//! Two contracts hold on every path:
//!
//! * one item's failure never prevents processing of the next item;
//! * every input artifact is deleted exactly once — success, failure, or
//!   fallback, the upload is consumed.

use crate::artifact::Artifact;
use crate::config::ConvertOptions;
use crate::error::ConvertError;
use crate::outcome::{BatchResult, Converted, ItemFailure, ItemSuccess, PageDownload};
use crate::store::ArtifactStore;
use crate::strategy::{ConversionPlan, StrategyOutcome};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-item progress notifications, used by the CLI progress bar.
///
/// Callbacks fire from the coordinator's task; implementations must be
/// cheap and must not block.
pub trait BatchProgress: Send + Sync {
    fn on_batch_start(&self, _total: usize) {}
    fn on_item_start(&self, _index: usize, _total: usize, _original_name: &str) {}
    fn on_item_converted(&self, _index: usize, _total: usize, _original_name: &str) {}
    fn on_item_failed(&self, _index: usize, _total: usize, _original_name: &str, _error: &str) {}
}

/// Drives a [`ConversionPlan`] over an ordered sequence of artifacts.
pub struct BatchCoordinator {
    store: Arc<ArtifactStore>,
    progress: Option<Arc<dyn BatchProgress>>,
}

impl BatchCoordinator {
    pub fn new(store: Arc<ArtifactStore>, progress: Option<Arc<dyn BatchProgress>>) -> Self {
        Self { store, progress }
    }

    /// Process every item; never aborts early.
    ///
    /// Returns a [`BatchResult`] whose `converted + failed` always equals
    /// the number of items submitted.
    pub async fn run(
        &self,
        plan: &ConversionPlan,
        items: Vec<Artifact>,
        options: &ConvertOptions,
    ) -> BatchResult {
        let total = items.len();
        if let Some(progress) = &self.progress {
            progress.on_batch_start(total);
        }

        let mut results = Vec::new();
        let mut errors = Vec::new();

        for (index, artifact) in items.into_iter().enumerate() {
            if let Some(progress) = &self.progress {
                progress.on_item_start(index, total, &artifact.original_name);
            }

            match self.convert_one(plan, &artifact, options).await {
                Ok(converted) => {
                    info!(
                        item = %artifact.original_name,
                        method = converted.method,
                        "converted"
                    );
                    if let Some(progress) = &self.progress {
                        progress.on_item_converted(index, total, &artifact.original_name);
                    }
                    results.push(item_success(&artifact, converted));
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(item = %artifact.original_name, error = %message, "conversion failed");
                    if let Some(progress) = &self.progress {
                        progress.on_item_failed(index, total, &artifact.original_name, &message);
                    }
                    errors.push(ItemFailure {
                        original_name: artifact.original_name.clone(),
                        error: message,
                    });
                }
            }

            // Cleanup is unconditional: the upload is consumed either way.
            self.store.delete_input(&artifact.path);
        }

        BatchResult::new(results, errors, total)
    }

    /// One item through the primary strategy, with at most one fallback
    /// hand-off.
    async fn convert_one(
        &self,
        plan: &ConversionPlan,
        artifact: &Artifact,
        options: &ConvertOptions,
    ) -> Result<Converted, ConvertError> {
        match plan.primary.convert(artifact, options).await? {
            StrategyOutcome::Converted(converted) => checked(converted, plan.primary.name()),
            StrategyOutcome::FallbackRequested => {
                let Some(fallback) = &plan.fallback else {
                    return Err(ConvertError::EngineFailed {
                        engine: "conversion",
                        detail: format!(
                            "{} requested a fallback but none is registered",
                            plan.primary.name()
                        ),
                    });
                };
                info!(
                    item = %artifact.original_name,
                    from = plan.primary.name(),
                    to = fallback.name(),
                    "retrying via fallback strategy"
                );
                match fallback.convert(artifact, options).await? {
                    StrategyOutcome::Converted(converted) => checked(converted, fallback.name()),
                    StrategyOutcome::FallbackRequested => Err(ConvertError::Internal(
                        "fallback strategy requested another fallback".to_string(),
                    )),
                }
            }
        }
    }
}

/// A success with no outputs is a strategy bug, not a success; catching
/// it here keeps [`Converted::primary`] total for every caller.
fn checked(converted: Converted, strategy: &'static str) -> Result<Converted, ConvertError> {
    if converted.outputs.is_empty() {
        return Err(ConvertError::Internal(format!(
            "{strategy} reported success without any output artifacts"
        )));
    }
    Ok(converted)
}

/// Shape one converted item for the outbound result.
fn item_success(artifact: &Artifact, converted: Converted) -> ItemSuccess {
    let primary = converted.primary();
    let pages = converted
        .outputs
        .iter()
        .filter_map(|o| {
            o.page.map(|page| PageDownload {
                page,
                download_path: format!("/converted/{}", o.file_name),
            })
        })
        .collect();

    ItemSuccess {
        success: true,
        original_name: artifact.original_name.clone(),
        filename: primary.file_name.clone(),
        download_path: format!("/converted/{}", primary.file_name),
        file_size: primary.size_bytes,
        conversion_method: Some(converted.method),
        quality: converted.quality.clone(),
        statistics: converted.statistics.clone(),
        pages,
    }
}
