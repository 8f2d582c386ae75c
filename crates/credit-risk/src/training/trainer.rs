use std::fmt;

use tracing::info;

use super::dataset::{DatasetError, LabeledDataset, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::scoring::evaluation::evaluate;
use crate::scoring::{
    ArtifactSaveError, ArtifactStore, ClassifierError, ClassifierModel, DecisionTreeModel,
    EncoderError, EncoderSettings, EncodingTable, EvaluationError, EvaluationReport,
    FeatureVector, LogisticModel, LogisticSettings, ModelArtifact, ModelKind, TargetEncoder,
    TreeSettings, UnknownCategory,
};

/// Knobs for one training run.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub encoder: EncoderSettings,
    pub logistic: LogisticSettings,
    pub tree: TreeSettings,
    /// Family whose artifact gets persisted.
    pub deployed: ModelKind,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderSettings::default(),
            logistic: LogisticSettings::default(),
            tree: TreeSettings::default(),
            deployed: ModelKind::Logistic,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Test,
}

impl Partition {
    pub const fn label(self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Test => "test",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvaluation {
    pub kind: ModelKind,
    pub partition: Partition,
    pub report: EvaluationReport,
}

/// Everything a run produced; nothing is written until [`TrainingOutcome::persist`].
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub encoder: EncodingTable,
    pub artifact: ModelArtifact,
    pub evaluations: Vec<ModelEvaluation>,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainingOutcome {
    pub fn evaluation(&self, kind: ModelKind, partition: Partition) -> Option<&EvaluationReport> {
        self.evaluations
            .iter()
            .find(|entry| entry.kind == kind && entry.partition == partition)
            .map(|entry| &entry.report)
    }

    pub fn persist(&self, store: &ArtifactStore) -> Result<(), ArtifactSaveError> {
        store.save(&self.encoder, &self.artifact)
    }
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Split, fit the encoder on the train side, train both families, and evaluate each
    /// on both partitions. The deployed artifact carries its train-partition F1 threshold.
    pub fn run(&self, dataset: &LabeledDataset) -> Result<TrainingOutcome, TrainingError> {
        let (train, test) = dataset.split(self.config.test_fraction, self.config.seed)?;
        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            train_default_rate = train.default_rate(),
            "dataset split"
        );

        let encoder =
            TargetEncoder::new(self.config.encoder).fit(train.records(), train.labels())?;
        let train_features = encode(&encoder, &train)?;
        let test_features = encode(&encoder, &test)?;

        let logistic =
            LogisticModel::fit(&train_features, train.labels(), &self.config.logistic).map_err(
                |source| TrainingError::Classifier {
                    kind: ModelKind::Logistic,
                    source,
                },
            )?;
        let tree = DecisionTreeModel::fit(&train_features, train.labels(), &self.config.tree)
            .map_err(|source| TrainingError::Classifier {
                kind: ModelKind::Tree,
                source,
            })?;
        info!(depth = tree.depth(), "decision tree fitted");

        let candidates: [ClassifierModel; 2] = [logistic.into(), tree.into()];
        let mut evaluations = Vec::with_capacity(4);
        for model in &candidates {
            for (partition, features, labels) in [
                (Partition::Train, &train_features, train.labels()),
                (Partition::Test, &test_features, test.labels()),
            ] {
                let report = evaluate(model, features, labels).map_err(|source| {
                    TrainingError::Evaluation {
                        kind: model.kind(),
                        partition,
                        source,
                    }
                })?;
                info!(
                    model = %model.kind(),
                    partition = %partition,
                    auc = report.auc,
                    ks = report.ks,
                    threshold = report.threshold,
                    f1 = report.f1,
                    "model evaluated"
                );
                evaluations.push(ModelEvaluation {
                    kind: model.kind(),
                    partition,
                    report,
                });
            }
        }

        let deployed = self.config.deployed;
        let [logistic, tree] = candidates;
        let classifier = match deployed {
            ModelKind::Logistic => logistic,
            ModelKind::Tree => tree,
        };
        let train_report = evaluations
            .iter()
            .find(|entry| entry.kind == deployed && entry.partition == Partition::Train)
            .map(|entry| entry.report.clone())
            .ok_or(TrainingError::MissingEvaluation(deployed))?;

        let artifact =
            ModelArtifact::new(classifier, train_report.threshold).with_metrics(train_report);
        info!(
            model = %deployed,
            threshold = artifact.threshold,
            "deployed model selected"
        );

        Ok(TrainingOutcome {
            encoder,
            artifact,
            evaluations,
            train_rows: train.len(),
            test_rows: test.len(),
        })
    }
}

fn encode(
    encoder: &EncodingTable,
    dataset: &LabeledDataset,
) -> Result<Vec<FeatureVector>, TrainingError> {
    dataset
        .records()
        .iter()
        .map(|record| encoder.transform(record).map_err(TrainingError::from))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("encoder fit failed: {0}")]
    Encoder(#[from] EncoderError),
    #[error("test partition: {0}")]
    Encoding(#[from] UnknownCategory),
    #[error("{kind} model failed to train: {source}")]
    Classifier {
        kind: ModelKind,
        source: ClassifierError,
    },
    #[error("{kind} model could not be evaluated on the {partition} partition: {source}")]
    Evaluation {
        kind: ModelKind,
        partition: Partition,
        source: EvaluationError,
    },
    #[error("no train-partition evaluation for the {0} model")]
    MissingEvaluation(ModelKind),
}
