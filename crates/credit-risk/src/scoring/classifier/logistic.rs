use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{validate_training_set, Classifier, ClassifierError};
use crate::scoring::schema::{FeatureVector, FEATURE_COUNT};

/// Gradient-descent controls for [`LogisticModel::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticSettings {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    /// Inverse L2 strength; larger means weaker regularization.
    pub inverse_regularization: f64,
    /// Reweight rows so both classes carry equal total weight.
    pub balanced: bool,
}

impl Default for LogisticSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            max_iter: 2000,
            tolerance: 1e-6,
            inverse_regularization: 1.0,
            balanced: true,
        }
    }
}

/// Logistic regression over standardized features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    intercept: f64,
    coefficients: [f64; FEATURE_COUNT],
    feature_means: [f64; FEATURE_COUNT],
    feature_scales: [f64; FEATURE_COUNT],
}

impl LogisticModel {
    /// Build a model from raw-scale parameters (no standardization).
    pub fn from_parts(intercept: f64, coefficients: [f64; FEATURE_COUNT]) -> Self {
        Self {
            intercept,
            coefficients,
            feature_means: [0.0; FEATURE_COUNT],
            feature_scales: [1.0; FEATURE_COUNT],
        }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64; FEATURE_COUNT] {
        &self.coefficients
    }

    pub fn fit(
        features: &[FeatureVector],
        labels: &[u8],
        settings: &LogisticSettings,
    ) -> Result<Self, ClassifierError> {
        let positives = validate_training_set(features, labels)?;
        let n = features.len();
        let negatives = n - positives;

        let (feature_means, feature_scales) = standardization(features);
        let standardized: Vec<[f64; FEATURE_COUNT]> = features
            .iter()
            .map(|row| standardize(row, &feature_means, &feature_scales))
            .collect();

        let (positive_weight, negative_weight) = if settings.balanced {
            (
                n as f64 / (2.0 * positives as f64),
                n as f64 / (2.0 * negatives as f64),
            )
        } else {
            (1.0, 1.0)
        };
        let weights: Vec<f64> = labels
            .iter()
            .map(|&label| if label == 1 { positive_weight } else { negative_weight })
            .collect();
        let total_weight: f64 = weights.iter().sum();
        let penalty = 1.0 / (settings.inverse_regularization * total_weight);

        let mut intercept = 0.0;
        let mut coefficients = [0.0; FEATURE_COUNT];
        let mut iterations = 0;

        for _ in 0..settings.max_iter {
            iterations += 1;
            let mut intercept_grad = 0.0;
            let mut coef_grad = [0.0; FEATURE_COUNT];

            for ((row, &label), &weight) in standardized.iter().zip(labels).zip(&weights) {
                let predicted = sigmoid(linear(intercept, &coefficients, row));
                let error = weight * (predicted - f64::from(label));
                intercept_grad += error;
                for (grad, value) in coef_grad.iter_mut().zip(row) {
                    *grad += error * value;
                }
            }

            intercept_grad /= total_weight;
            for (grad, coef) in coef_grad.iter_mut().zip(&coefficients) {
                *grad = *grad / total_weight + penalty * coef;
            }

            intercept -= settings.learning_rate * intercept_grad;
            for (coef, grad) in coefficients.iter_mut().zip(&coef_grad) {
                *coef -= settings.learning_rate * grad;
            }

            if intercept_grad.abs() < settings.tolerance
                && coef_grad.iter().all(|grad| grad.abs() < settings.tolerance)
            {
                break;
            }
        }

        debug!(iterations, intercept, "logistic regression converged");

        Ok(Self {
            intercept,
            coefficients,
            feature_means,
            feature_scales,
        })
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let finite = self.intercept.is_finite()
            && self.coefficients.iter().all(|value| value.is_finite())
            && self.feature_means.iter().all(|value| value.is_finite());
        if !finite {
            return Err("logistic parameters must be finite".to_string());
        }
        if self
            .feature_scales
            .iter()
            .any(|scale| !scale.is_finite() || *scale <= 0.0)
        {
            return Err("logistic feature scales must be positive".to_string());
        }
        Ok(())
    }
}

impl Classifier for LogisticModel {
    fn positive_probability(&self, features: &FeatureVector) -> f64 {
        let row = standardize(features, &self.feature_means, &self.feature_scales);
        sigmoid(linear(self.intercept, &self.coefficients, &row))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn linear(
    intercept: f64,
    coefficients: &[f64; FEATURE_COUNT],
    row: &[f64; FEATURE_COUNT],
) -> f64 {
    coefficients
        .iter()
        .zip(row)
        .fold(intercept, |acc, (coef, value)| acc + coef * value)
}

fn standardize(
    features: &FeatureVector,
    means: &[f64; FEATURE_COUNT],
    scales: &[f64; FEATURE_COUNT],
) -> [f64; FEATURE_COUNT] {
    let mut row = [0.0; FEATURE_COUNT];
    for (index, slot) in row.iter_mut().enumerate() {
        *slot = (features.0[index] - means[index]) / scales[index];
    }
    row
}

/// Column means and population standard deviations; constant columns get scale 1.
fn standardization(
    features: &[FeatureVector],
) -> ([f64; FEATURE_COUNT], [f64; FEATURE_COUNT]) {
    let n = features.len() as f64;
    let mut means = [0.0; FEATURE_COUNT];
    for row in features {
        for (mean, value) in means.iter_mut().zip(row.values()) {
            *mean += value / n;
        }
    }

    let mut scales = [0.0; FEATURE_COUNT];
    for row in features {
        for ((scale, value), mean) in scales.iter_mut().zip(row.values()).zip(&means) {
            *scale += (value - mean).powi(2) / n;
        }
    }
    for scale in &mut scales {
        *scale = scale.sqrt();
        if *scale < 1e-12 {
            *scale = 1.0;
        }
    }

    (means, scales)
}
