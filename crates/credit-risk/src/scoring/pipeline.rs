use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::artifacts::{ArtifactLoadError, ArtifactStore, ModelArtifact};
use super::classifier::Classifier;
use super::encoder::{EncodingTable, UnknownCategory, UnknownCategoryPolicy};
use super::schema::{ClientRecord, SchemaViolation};

pub const HIGH_RISK_LABEL: &str = "HIGH default risk (1)";
pub const LOW_RISK_LABEL: &str = "LOW risk / payer (0)";

/// Result of scoring one applicant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    pub predicted_class: u8,
    /// Rounded to four decimal places.
    pub probability_of_default: f64,
    pub label_text: &'static str,
}

impl PredictionOutcome {
    fn new(probability: f64, threshold: f64) -> Self {
        let predicted_class = u8::from(probability >= threshold);
        Self {
            predicted_class,
            probability_of_default: (probability * 10_000.0).round() / 10_000.0,
            label_text: label_for(predicted_class),
        }
    }
}

pub fn label_for(class: u8) -> &'static str {
    if class == 1 {
        HIGH_RISK_LABEL
    } else {
        LOW_RISK_LABEL
    }
}

/// Encoder and classifier loaded together; immutable once built.
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    encoder: EncodingTable,
    model: ModelArtifact,
}

impl InferencePipeline {
    pub fn new(encoder: EncodingTable, model: ModelArtifact) -> Self {
        Self { encoder, model }
    }

    /// Read `encoder.json` and `model.json` from `directory`.
    pub fn load(directory: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        Self::from_store(&ArtifactStore::new(directory.as_ref()))
    }

    pub fn from_store(store: &ArtifactStore) -> Result<Self, ArtifactLoadError> {
        let encoder = store.load_encoder()?;
        let model = store.load_model()?;
        Ok(Self::new(encoder, model))
    }

    /// Serve with `policy` instead of the one stored in `encoder.json`.
    pub fn with_unknown_category(self, policy: UnknownCategoryPolicy) -> Self {
        Self {
            encoder: self.encoder.with_unknown_category(policy),
            model: self.model,
        }
    }

    pub fn encoder(&self) -> &EncodingTable {
        &self.encoder
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    pub fn threshold(&self) -> f64 {
        self.model.threshold
    }

    pub fn predict(&self, record: &ClientRecord) -> Result<PredictionOutcome, PredictionError> {
        let features = self.encoder.transform(record)?;
        let [_, probability] = self.model.classifier.predict_proba(&features);
        if !probability.is_finite() {
            return Err(PredictionError::Inference {
                detail: format!("{} model produced a non-finite probability", self.model.kind),
            });
        }

        let outcome = PredictionOutcome::new(probability, self.model.threshold);
        debug!(
            probability,
            threshold = self.model.threshold,
            class = outcome.predicted_class,
            "scored client record"
        );
        Ok(outcome)
    }
}

/// Per-request failure; the stage tells callers which layer rejected the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
    #[error("inference failed: {detail}")]
    Inference { detail: String },
}

impl PredictionError {
    pub fn stage(&self) -> &'static str {
        match self {
            PredictionError::Schema(_) => "schema",
            PredictionError::UnknownCategory(_) => "encoding",
            PredictionError::Inference { .. } => "inference",
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            PredictionError::Schema(violation) => violation.field(),
            PredictionError::UnknownCategory(_) => Some("EducationLevel"),
            PredictionError::Inference { .. } => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, PredictionError::Inference { .. })
    }
}
