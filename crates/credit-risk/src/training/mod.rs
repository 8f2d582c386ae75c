//! Offline workflow: CSV dataset loading, seeded split, encoder and classifier
//! fitting, evaluation, and the exploratory dataset profile.

pub mod dataset;
pub mod profile;
pub mod trainer;

pub use dataset::{DatasetError, LabeledDataset, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
pub use profile::{CategoryProfile, ColumnProfile, DatasetProfile};
pub use trainer::{
    ModelEvaluation, Partition, Trainer, TrainingConfig, TrainingError, TrainingOutcome,
};
