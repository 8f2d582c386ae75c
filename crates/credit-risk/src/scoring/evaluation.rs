//! Ranking and threshold metrics for fitted classifiers.
//!
//! Class 0 = payer, class 1 = default.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::classifier::Classifier;
use super::schema::FeatureVector;

/// ROC points in descending-threshold order, starting at `(0, 0)` with threshold `+inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
    pub tps: Vec<usize>,
    pub fps: Vec<usize>,
}

impl RocCurve {
    pub fn positives(&self) -> usize {
        self.tps.last().copied().unwrap_or(0)
    }

    pub fn negatives(&self) -> usize {
        self.fps.last().copied().unwrap_or(0)
    }
}

/// Build the ROC curve with one point per distinct score.
pub fn roc_curve(scores: &[f64], labels: &[u8]) -> Result<RocCurve, EvaluationError> {
    check_inputs(scores, labels)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f64::INFINITY],
        tps: vec![0],
        fps: vec![0],
    };

    let mut tp = 0;
    let mut fp = 0;
    for (position, &index) in order.iter().enumerate() {
        if labels[index] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_group = order
            .get(position + 1)
            .map_or(true, |&next| scores[next] != scores[index]);
        if last_of_group {
            curve.tps.push(tp);
            curve.fps.push(fp);
            curve.thresholds.push(scores[index]);
        }
    }

    let positives = tp as f64;
    let negatives = fp as f64;
    curve.tpr = curve.tps.iter().map(|&count| count as f64 / positives).collect();
    curve.fpr = curve.fps.iter().map(|&count| count as f64 / negatives).collect();
    Ok(curve)
}

/// Trapezoidal area under the curve.
pub fn auc(curve: &RocCurve) -> f64 {
    curve
        .fpr
        .windows(2)
        .zip(curve.tpr.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

pub fn ks_statistic(curve: &RocCurve) -> f64 {
    curve
        .tpr
        .iter()
        .zip(&curve.fpr)
        .map(|(tpr, fpr)| tpr - fpr)
        .fold(0.0, f64::max)
}

/// Counts at a single decision threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_count: usize,
}

impl ConfusionMatrix {
    /// Tally predictions where class 1 means `score >= threshold`.
    pub fn at_threshold(scores: &[f64], labels: &[u8], threshold: f64) -> Self {
        let mut matrix = Self::default();
        for (&score, &label) in scores.iter().zip(labels) {
            match (score >= threshold, label == 1) {
                (true, true) => matrix.tp += 1,
                (true, false) => matrix.fp += 1,
                (false, false) => matrix.tn += 1,
                (false, true) => matrix.fn_count += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_count
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_count)
    }

    pub fn f1(&self) -> f64 {
        f1_from_counts(self.tp, self.fp, self.fn_count)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1_from_counts(tp: usize, fp: usize, fn_count: usize) -> f64 {
    ratio(2 * tp, 2 * tp + fp + fn_count)
}

/// Metrics of one model on one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub auc: f64,
    pub ks: f64,
    /// F1-maximizing cut-off; the remaining fields are measured at it.
    pub threshold: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "auc={:.4} ks={:.4} threshold={:.4} acc={:.4} prec={:.4} rec={:.4} f1={:.4} (tp={} fp={} tn={} fn={})",
            self.auc,
            self.ks,
            self.threshold,
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.confusion.tp,
            self.confusion.fp,
            self.confusion.tn,
            self.confusion.fn_count,
        )
    }
}

/// Score `features` with `model` and report its metrics.
pub fn evaluate<C>(
    model: &C,
    features: &[FeatureVector],
    labels: &[u8],
) -> Result<EvaluationReport, EvaluationError>
where
    C: Classifier + ?Sized,
{
    let scores: Vec<f64> = features
        .iter()
        .map(|row| model.predict_proba(row)[1])
        .collect();
    evaluate_scores(&scores, labels)
}

pub fn evaluate_scores(
    scores: &[f64],
    labels: &[u8],
) -> Result<EvaluationReport, EvaluationError> {
    let curve = roc_curve(scores, labels)?;
    let threshold = best_f1_threshold(&curve);
    let confusion = ConfusionMatrix::at_threshold(scores, labels, threshold);

    Ok(EvaluationReport {
        samples: scores.len(),
        auc: auc(&curve),
        ks: ks_statistic(&curve),
        threshold,
        accuracy: confusion.accuracy(),
        precision: confusion.precision(),
        recall: confusion.recall(),
        f1: confusion.f1(),
        confusion,
    })
}

/// Highest-F1 finite ROC threshold; ties keep the larger threshold.
fn best_f1_threshold(curve: &RocCurve) -> f64 {
    let positives = curve.positives();
    let mut best = (f64::NEG_INFINITY, 0.5);
    let points = curve.thresholds.iter().zip(&curve.tps).zip(&curve.fps);
    for ((&threshold, &tp), &fp) in points.skip(1) {
        let f1 = f1_from_counts(tp, fp, positives - tp);
        if f1 > best.0 {
            best = (f1, threshold);
        }
    }
    best.1
}

fn check_inputs(scores: &[f64], labels: &[u8]) -> Result<(), EvaluationError> {
    if scores.is_empty() {
        return Err(EvaluationError::Empty);
    }
    if scores.len() != labels.len() {
        return Err(EvaluationError::LengthMismatch {
            scores: scores.len(),
            labels: labels.len(),
        });
    }
    if let Some((index, &value)) = labels.iter().enumerate().find(|&(_, &label)| label > 1) {
        return Err(EvaluationError::NonBinaryLabel { index, value });
    }
    if let Some(index) = scores.iter().position(|score| !score.is_finite()) {
        return Err(EvaluationError::NonFiniteScore { index });
    }
    let positives = labels.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == labels.len() {
        return Err(EvaluationError::SingleClass);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("cannot evaluate zero rows")]
    Empty,
    #[error("{scores} scores but {labels} labels")]
    LengthMismatch { scores: usize, labels: usize },
    #[error("label {value} at row {index} is not 0 or 1")]
    NonBinaryLabel { index: usize, value: u8 },
    #[error("score at row {index} is not finite")]
    NonFiniteScore { index: usize },
    #[error("labels contain a single class; ROC metrics are undefined")]
    SingleClass,
}
