use crate::infra::load_pipeline;
use clap::Args;
use credit_risk::config::AppConfig;
use credit_risk::error::AppError;
use credit_risk::scoring::{
    ArtifactStore, ClientRecord, ClientRecordPayload, ModelKind, PredictionError,
};
use credit_risk::telemetry;
use credit_risk::training::{
    DatasetProfile, LabeledDataset, Trainer, TrainingConfig, TrainingOutcome, DEFAULT_SEED,
    DEFAULT_TEST_FRACTION,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct TrainArgs {
    /// Labelled CSV export with a Default column
    #[arg(long)]
    pub(crate) data: PathBuf,
    /// Where encoder.json and model.json are written (defaults to APP_ARTIFACT_DIR)
    #[arg(long)]
    pub(crate) artifact_dir: Option<PathBuf>,
    /// Classifier family to persist: logistic or tree
    #[arg(long, default_value = "logistic")]
    pub(crate) model: ModelKind,
    /// Share of rows held out for the test partition
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    pub(crate) test_fraction: f64,
    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub(crate) seed: u64,
}

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) age: i64,
    /// Basic, Medium, IncompleteHigherEd, CompletedHigherEd, Postgraduate (or Bas, Med, SupInc, SupCom, Posg)
    #[arg(long)]
    pub(crate) education: String,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) years_employed: i64,
    /// Income in thousands
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) income: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) commercial_debt: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) credit_card_debt: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) other_debt: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) income_to_debt_ratio: f64,
    /// Directory holding encoder.json and model.json (defaults to APP_ARTIFACT_DIR)
    #[arg(long)]
    pub(crate) artifact_dir: Option<PathBuf>,
}

impl PredictArgs {
    fn payload(&self) -> ClientRecordPayload {
        ClientRecordPayload {
            age: Some(self.age as f64),
            education_level: Some(self.education.clone()),
            years_employed: Some(self.years_employed as f64),
            income: Some(self.income),
            commercial_debt: Some(self.commercial_debt),
            credit_card_debt: Some(self.credit_card_debt),
            other_debt: Some(self.other_debt),
            income_to_debt_ratio: Some(self.income_to_debt_ratio),
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ProfileArgs {
    /// Labelled CSV export with a Default column
    #[arg(long)]
    pub(crate) data: PathBuf,
}

pub(crate) fn run_train(args: TrainArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let TrainArgs {
        data,
        artifact_dir,
        model,
        test_fraction,
        seed,
    } = args;

    let dataset = LabeledDataset::from_path(&data)?;
    let trainer = Trainer::new(TrainingConfig {
        encoder: config.encoder,
        deployed: model,
        test_fraction,
        seed,
        ..TrainingConfig::default()
    });
    let outcome = trainer.run(&dataset)?;

    let store = ArtifactStore::new(artifact_dir.unwrap_or(config.artifacts.directory));
    outcome.persist(&store)?;

    render_training_summary(&dataset, &outcome, &store);
    Ok(())
}

fn render_training_summary(
    dataset: &LabeledDataset,
    outcome: &TrainingOutcome,
    store: &ArtifactStore,
) {
    println!(
        "Trained on {} rows ({} train / {} test, {} duplicates dropped)",
        dataset.len(),
        outcome.train_rows,
        outcome.test_rows,
        dataset.duplicates_dropped()
    );
    println!();
    for evaluation in &outcome.evaluations {
        println!(
            "{:<9} {:<5} {}",
            evaluation.kind.label(),
            evaluation.partition.label(),
            evaluation.report
        );
    }
    println!();
    println!(
        "Deployed {} model with threshold {:.4}",
        outcome.artifact.kind, outcome.artifact.threshold
    );
    println!("  encoder: {}", store.encoder_path().display());
    println!("  model:   {}", store.model_path().display());
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let directory = args
        .artifact_dir
        .clone()
        .unwrap_or(config.artifacts.directory);

    let record = ClientRecord::try_from(args.payload()).map_err(PredictionError::from)?;
    let pipeline = load_pipeline(&directory, config.artifacts.unknown_category)?;
    let outcome = pipeline.predict(&record)?;

    println!("Prediction class: {}", outcome.predicted_class);
    println!("Label: {}", outcome.label_text);
    println!(
        "Probability of default: {:.4} (threshold {:.4})",
        outcome.probability_of_default,
        pipeline.threshold()
    );
    Ok(())
}

pub(crate) fn run_profile(args: ProfileArgs) -> Result<(), AppError> {
    let dataset = LabeledDataset::from_path(&args.data)?;
    let profile = DatasetProfile::from_dataset(&dataset);
    println!("{profile}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use credit_risk::scoring::SchemaViolation;

    fn predict_args() -> PredictArgs {
        PredictArgs {
            age: 41,
            education: "Posg".to_string(),
            years_employed: 12,
            income: 96.0,
            commercial_debt: 4.2,
            credit_card_debt: 1.1,
            other_debt: 3.0,
            income_to_debt_ratio: 0.085,
            artifact_dir: None,
        }
    }

    #[test]
    fn predict_args_validate_like_http_payloads() {
        let record = ClientRecord::try_from(predict_args().payload()).expect("valid record");
        assert_eq!(record.age, 41);
        assert_eq!(record.years_employed, 12);

        let mut args = predict_args();
        args.age = 0;
        assert!(matches!(
            ClientRecord::try_from(args.payload()),
            Err(SchemaViolation::OutOfDomain { field: "Age", .. })
        ));
    }

    #[test]
    fn predict_reports_missing_artifacts() {
        let mut args = predict_args();
        args.artifact_dir = Some(std::env::temp_dir().join(format!(
            "credit-risk-api-no-artifacts-{}",
            std::process::id()
        )));
        let err = run_predict(args).expect_err("artifacts are absent");
        assert!(matches!(err, AppError::Artifact(_)));
    }

    #[test]
    fn profile_surfaces_unreadable_datasets() {
        let err = run_profile(ProfileArgs {
            data: PathBuf::from("does-not-exist.csv"),
        })
        .expect_err("file is absent");
        assert!(matches!(err, AppError::Dataset(_)));
    }
}
