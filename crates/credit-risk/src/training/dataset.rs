use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Deserialize;
use tracing::{debug, info};

use crate::scoring::{ClientRecord, ClientRecordPayload, EducationLevel, SchemaViolation};

pub const DEFAULT_TEST_FRACTION: f64 = 0.3;
pub const DEFAULT_SEED: u64 = 21;

/// Client rows with their observed default label, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    records: Vec<ClientRecord>,
    labels: Vec<u8>,
    duplicates_dropped: usize,
}

impl LabeledDataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            duplicates_dropped = dataset.duplicates_dropped,
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse a headed CSV; exact duplicate rows keep their first occurrence.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut labels = Vec::new();
        let mut duplicates_dropped = 0;

        for (index, row) in csv_reader.deserialize::<DatasetRow>().enumerate() {
            let line = index + 2;
            let row = row?;
            if !seen.insert(row.key()) {
                duplicates_dropped += 1;
                debug!(line, "dropping duplicate row");
                continue;
            }

            let label = match row.label {
                Some(value @ (0 | 1)) => value as u8,
                Some(value) => return Err(DatasetError::InvalidLabel { line, value }),
                None => return Err(DatasetError::MissingLabel { line }),
            };
            let record = ClientRecord::try_from(row.into_payload())
                .map_err(|source| DatasetError::Row { line, source })?;

            records.push(record);
            labels.push(label);
        }

        if records.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            records,
            labels,
            duplicates_dropped,
        })
    }

    pub fn from_parts(records: Vec<ClientRecord>, labels: Vec<u8>) -> Result<Self, DatasetError> {
        if records.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                records: records.len(),
                labels: labels.len(),
            });
        }
        if let Some(position) = labels.iter().position(|&label| label > 1) {
            return Err(DatasetError::InvalidLabel {
                line: position + 2,
                value: i64::from(labels[position]),
            });
        }
        Ok(Self {
            records,
            labels,
            duplicates_dropped: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&label| label == 1).count()
    }

    pub fn default_rate(&self) -> f64 {
        if self.labels.is_empty() {
            0.0
        } else {
            self.positives() as f64 / self.labels.len() as f64
        }
    }

    /// Seeded shuffle into `(train, test)`; the test side gets `ceil(len * test_fraction)` rows.
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self), DatasetError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(DatasetError::InvalidSplit(test_fraction));
        }
        let test_len = (self.len() as f64 * test_fraction).ceil() as usize;
        if test_len == 0 || test_len >= self.len() {
            return Err(DatasetError::TooSmallToSplit {
                rows: self.len(),
                test_fraction,
            });
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let (test_indices, train_indices) = order.split_at(test_len);
        Ok((self.subset(train_indices), self.subset(test_indices)))
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            duplicates_dropped: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatasetRow {
    #[serde(rename = "Id_Cliente", alias = "ClientId", default)]
    client_id: Option<String>,
    #[serde(rename = "Age", alias = "Edad", default)]
    age: Option<f64>,
    #[serde(rename = "EducationLevel", alias = "Nivel_Educacional", default)]
    education_level: Option<String>,
    #[serde(rename = "YearsEmployed", alias = "Años_Trabajando", default)]
    years_employed: Option<f64>,
    #[serde(rename = "Income", alias = "Ingresos", default)]
    income: Option<f64>,
    #[serde(rename = "CommercialDebt", alias = "Deuda_Comercial", default)]
    commercial_debt: Option<f64>,
    #[serde(rename = "CreditCardDebt", alias = "Deuda_Credito", default)]
    credit_card_debt: Option<f64>,
    #[serde(rename = "OtherDebt", alias = "Otras_Deudas", default)]
    other_debt: Option<f64>,
    #[serde(rename = "IncomeToDebtRatio", alias = "Ratio_Ingresos_Deudas", default)]
    income_to_debt_ratio: Option<f64>,
    #[serde(rename = "Default", default)]
    label: Option<i64>,
}

type RowKey = (Option<String>, Option<String>, [Option<u64>; 7], Option<i64>);

impl DatasetRow {
    fn key(&self) -> RowKey {
        let level = self.education_level.as_deref().map(|raw| {
            raw.parse::<EducationLevel>()
                .map(|level| level.as_str().to_string())
                .unwrap_or_else(|_| raw.to_string())
        });
        let bits = |value: Option<f64>| value.map(f64::to_bits);
        (
            self.client_id.clone(),
            level,
            [
                bits(self.age),
                bits(self.years_employed),
                bits(self.income),
                bits(self.commercial_debt),
                bits(self.credit_card_debt),
                bits(self.other_debt),
                bits(self.income_to_debt_ratio),
            ],
            self.label,
        )
    }

    fn into_payload(self) -> ClientRecordPayload {
        ClientRecordPayload {
            age: self.age,
            education_level: self.education_level,
            years_employed: self.years_employed,
            income: self.income,
            commercial_debt: self.commercial_debt,
            credit_card_debt: self.credit_card_debt,
            other_debt: self.other_debt,
            income_to_debt_ratio: self.income_to_debt_ratio,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {source}")]
    Row {
        line: usize,
        source: SchemaViolation,
    },
    #[error("line {line}: missing `Default` label")]
    MissingLabel { line: usize },
    #[error("line {line}: label {value} is not 0 or 1")]
    InvalidLabel { line: usize, value: i64 },
    #[error("{records} records but {labels} labels")]
    LengthMismatch { records: usize, labels: usize },
    #[error("dataset contains no rows")]
    Empty,
    #[error("test fraction must be strictly between 0 and 1 (got {0})")]
    InvalidSplit(f64),
    #[error("{rows} rows cannot be split with test fraction {test_fraction}")]
    TooSmallToSplit { rows: usize, test_fraction: f64 },
}
