//! Binary default classifiers over the encoded feature vector.
//!
//! Both model families expose the probability of class 1 (default); the decision
//! threshold is owned by the caller so that serving always applies the value that
//! was selected at training time.

mod logistic;
mod tree;

pub use logistic::{LogisticModel, LogisticSettings};
pub use tree::{DecisionTreeModel, TreeNode, TreeSettings};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::schema::FeatureVector;

/// Shared inference contract of the model families.
pub trait Classifier {
    /// Probability that the applicant defaults.
    fn positive_probability(&self, features: &FeatureVector) -> f64;

    /// `[p(payer), p(default)]`, summing to one.
    fn predict_proba(&self, features: &FeatureVector) -> [f64; 2] {
        let positive = self.positive_probability(features).clamp(0.0, 1.0);
        [1.0 - positive, positive]
    }

    /// Class 1 iff the default probability reaches `threshold`.
    fn predict(&self, features: &FeatureVector, threshold: f64) -> u8 {
        u8::from(self.predict_proba(features)[1] >= threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Logistic,
    Tree,
}

impl ModelKind {
    pub const fn label(self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::Tree => "tree",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "logistic" | "logit" => Ok(Self::Logistic),
            "tree" | "decision_tree" => Ok(Self::Tree),
            other => Err(format!("unknown model kind '{other}' (expected logistic or tree)")),
        }
    }
}

/// Serializable classifier of either family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ClassifierModel {
    Logistic(LogisticModel),
    Tree(DecisionTreeModel),
}

impl ClassifierModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            ClassifierModel::Logistic(_) => ModelKind::Logistic,
            ClassifierModel::Tree(_) => ModelKind::Tree,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            ClassifierModel::Logistic(model) => model.validate(),
            ClassifierModel::Tree(model) => model.validate(),
        }
    }
}

impl Classifier for ClassifierModel {
    fn positive_probability(&self, features: &FeatureVector) -> f64 {
        match self {
            ClassifierModel::Logistic(model) => model.positive_probability(features),
            ClassifierModel::Tree(model) => model.positive_probability(features),
        }
    }
}

impl From<LogisticModel> for ClassifierModel {
    fn from(model: LogisticModel) -> Self {
        Self::Logistic(model)
    }
}

impl From<DecisionTreeModel> for ClassifierModel {
    fn from(model: DecisionTreeModel) -> Self {
        Self::Tree(model)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("cannot train on zero rows")]
    Empty,
    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
    #[error("label {value} at row {index} is not 0 or 1")]
    NonBinaryLabel { index: usize, value: u8 },
    #[error("training labels contain a single class")]
    SingleClass,
    #[error("feature {feature} at row {index} is not finite")]
    NonFiniteFeature { index: usize, feature: usize },
}

/// Checks shared by both trainers; returns the positive count.
pub(crate) fn validate_training_set(
    features: &[FeatureVector],
    labels: &[u8],
) -> Result<usize, ClassifierError> {
    if features.is_empty() {
        return Err(ClassifierError::Empty);
    }
    if features.len() != labels.len() {
        return Err(ClassifierError::LengthMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if let Some((index, &value)) = labels.iter().enumerate().find(|&(_, &label)| label > 1) {
        return Err(ClassifierError::NonBinaryLabel { index, value });
    }
    for (index, row) in features.iter().enumerate() {
        if let Some(feature) = row.values().iter().position(|value| !value.is_finite()) {
            return Err(ClassifierError::NonFiniteFeature { index, feature });
        }
    }

    let positives = labels.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == labels.len() {
        return Err(ClassifierError::SingleClass);
    }
    Ok(positives)
}
