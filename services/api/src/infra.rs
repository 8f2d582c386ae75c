use credit_risk::scoring::{ArtifactLoadError, InferencePipeline, UnknownCategoryPolicy};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    /// True once the listener is bound and the scoring pipeline loaded.
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load the persisted pipeline, applying a configured unknown-category policy
/// over the one stored with the encoder.
pub(crate) fn load_pipeline(
    directory: &Path,
    unknown_category: Option<UnknownCategoryPolicy>,
) -> Result<InferencePipeline, ArtifactLoadError> {
    let pipeline = InferencePipeline::load(directory)?;
    Ok(match unknown_category {
        Some(policy) => pipeline.with_unknown_category(policy),
        None => pipeline,
    })
}
