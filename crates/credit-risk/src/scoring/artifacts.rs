use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::{ClassifierModel, ModelKind};
use super::encoder::EncodingTable;
use super::evaluation::EvaluationReport;
use super::schema::FEATURE_NAMES;

pub const ENCODER_FILE: &str = "encoder.json";
pub const MODEL_FILE: &str = "model.json";

/// Deployed classifier together with the threshold selected for it at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: ModelKind,
    pub threshold: f64,
    pub feature_names: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub classifier: ClassifierModel,
    /// Training-partition metrics the threshold was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EvaluationReport>,
}

impl ModelArtifact {
    pub fn new(classifier: ClassifierModel, threshold: f64) -> Self {
        Self {
            kind: classifier.kind(),
            threshold,
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            trained_at: Utc::now(),
            classifier,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: EvaluationReport) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!("threshold {} outside [0, 1]", self.threshold));
        }
        if self.kind != self.classifier.kind() {
            return Err(format!(
                "artifact labelled {} holds a {} classifier",
                self.kind,
                self.classifier.kind()
            ));
        }
        self.classifier.validate()
    }

    fn features_match(&self) -> bool {
        self.feature_names.len() == FEATURE_NAMES.len()
            && self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES)
                .all(|(stored, expected)| stored == expected)
    }
}

/// Flat JSON files under one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    directory: PathBuf,
}

impl ArtifactStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.directory.join(ENCODER_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.directory.join(MODEL_FILE)
    }

    /// Write both artifacts, creating the directory when needed.
    pub fn save(
        &self,
        encoder: &EncodingTable,
        model: &ModelArtifact,
    ) -> Result<(), ArtifactSaveError> {
        fs::create_dir_all(&self.directory).map_err(|source| ArtifactSaveError::Io {
            path: self.directory.clone(),
            source,
        })?;
        write_json(&self.encoder_path(), encoder)?;
        write_json(&self.model_path(), model)?;
        info!(
            directory = %self.directory.display(),
            model = %model.kind,
            threshold = model.threshold,
            "artifacts saved"
        );
        Ok(())
    }

    pub fn load_encoder(&self) -> Result<EncodingTable, ArtifactLoadError> {
        let path = self.encoder_path();
        let table: EncodingTable = read_json(&path)?;
        table
            .validate()
            .map_err(|reason| ArtifactLoadError::Invalid { path, reason })?;
        Ok(table)
    }

    pub fn load_model(&self) -> Result<ModelArtifact, ArtifactLoadError> {
        let path = self.model_path();
        let artifact: ModelArtifact = read_json(&path)?;
        if !artifact.features_match() {
            return Err(ArtifactLoadError::FeatureMismatch {
                path,
                found: artifact.feature_names,
            });
        }
        artifact
            .validate()
            .map_err(|reason| ArtifactLoadError::Invalid { path, reason })?;
        Ok(artifact)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactSaveError> {
    let io_error = |source: io::Error| ArtifactSaveError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| {
        ArtifactSaveError::Serialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactLoadError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ArtifactLoadError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactLoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactLoadError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Start-up failure reading a persisted artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadError {
    #[error("artifact {} not found", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read artifact {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("artifact {} is not valid JSON for its type: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("artifact {} was trained on features {found:?}", path.display())]
    FeatureMismatch { path: PathBuf, found: Vec<String> },
    #[error("artifact {} failed validation: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactSaveError {
    #[error("failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::classifier::LogisticModel;
    use crate::scoring::encoder::{CategoryEncoding, EncoderSettings};
    use crate::scoring::schema::EducationLevel;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "credit-risk-artifacts-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn table() -> EncodingTable {
        EncodingTable::from_parts(
            0.25,
            vec![CategoryEncoding {
                category: EducationLevel::Medium,
                count: 40,
                default_rate: 0.3,
                value: 0.2999,
            }],
            EncoderSettings::default(),
        )
    }

    fn artifact() -> ModelArtifact {
        let mut coefficients = [0.0; 8];
        coefficients[4] = 0.35;
        ModelArtifact::new(LogisticModel::from_parts(-1.2, coefficients).into(), 0.4137)
    }

    #[test]
    fn save_then_load_preserves_artifacts() {
        let store = ArtifactStore::new(scratch_dir("roundtrip"));
        store.save(&table(), &artifact()).expect("save succeeds");

        assert_eq!(store.load_encoder().expect("encoder loads"), table());
        let loaded = store.load_model().expect("model loads");
        assert_eq!(loaded.threshold, 0.4137);
        assert_eq!(loaded.kind, ModelKind::Logistic);
        assert_eq!(loaded.classifier, artifact().classifier);

        let _ = fs::remove_dir_all(store.directory());
    }

    #[test]
    fn missing_directory_reports_missing() {
        let store = ArtifactStore::new(scratch_dir("missing"));
        assert!(matches!(
            store.load_model(),
            Err(ArtifactLoadError::Missing { .. })
        ));
        assert!(matches!(
            store.load_encoder(),
            Err(ArtifactLoadError::Missing { .. })
        ));
    }

    #[test]
    fn corrupt_and_mismatched_files_are_rejected() {
        let store = ArtifactStore::new(scratch_dir("corrupt"));
        store.save(&table(), &artifact()).unwrap();

        fs::write(store.encoder_path(), b"{ not json").unwrap();
        assert!(matches!(
            store.load_encoder(),
            Err(ArtifactLoadError::Corrupt { .. })
        ));

        let mut renamed = artifact();
        renamed.feature_names.swap(0, 1);
        store.save(&table(), &renamed).unwrap();
        match store.load_model() {
            Err(ArtifactLoadError::FeatureMismatch { found, .. }) => {
                assert_eq!(found[0], "EducationLevel");
            }
            other => panic!("expected feature mismatch, got {other:?}"),
        }

        let mut out_of_range = artifact();
        out_of_range.threshold = 1.5;
        store.save(&table(), &out_of_range).unwrap();
        assert!(matches!(
            store.load_model(),
            Err(ArtifactLoadError::Invalid { .. })
        ));

        let _ = fs::remove_dir_all(store.directory());
    }
}
