//! Credit default scoring: schema boundary, target encoding, classifiers,
//! evaluation, persisted artifacts, and the HTTP inference surface.

pub mod artifacts;
pub mod classifier;
pub mod encoder;
pub mod evaluation;
pub mod pipeline;
pub mod router;
pub mod schema;

#[cfg(test)]
mod tests;

pub use artifacts::{
    ArtifactLoadError, ArtifactSaveError, ArtifactStore, ModelArtifact, ENCODER_FILE, MODEL_FILE,
};
pub use classifier::{
    Classifier, ClassifierError, ClassifierModel, DecisionTreeModel, LogisticModel,
    LogisticSettings, ModelKind, TreeNode, TreeSettings,
};
pub use encoder::{
    CategoryEncoding, EncoderError, EncoderSettings, EncodingTable, TargetEncoder,
    UnknownCategory, UnknownCategoryPolicy,
};
pub use evaluation::{evaluate, ConfusionMatrix, EvaluationError, EvaluationReport, RocCurve};
pub use pipeline::{
    label_for, InferencePipeline, PredictionError, PredictionOutcome, HIGH_RISK_LABEL,
    LOW_RISK_LABEL,
};
pub use router::{prediction_router, PipelineState, PredictionResponse};
pub use schema::{
    ClientRecord, ClientRecordPayload, EducationLevel, FeatureVector, SchemaViolation,
    FEATURE_COUNT, FEATURE_NAMES,
};
