use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::schema::{ClientRecord, EducationLevel, FeatureVector};

/// What `transform` does with a category the table was never fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Encode as the training prior.
    GlobalMean,
    /// Fail the request with [`UnknownCategory`].
    Reject,
}

impl FromStr for UnknownCategoryPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mean" | "global_mean" | "fallback" => Ok(Self::GlobalMean),
            "reject" | "strict" => Ok(Self::Reject),
            other => Err(other.to_string()),
        }
    }
}

/// Blending parameters for target encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Steepness of the prior/category blend; must be positive.
    pub smoothing: f64,
    /// Category size at which the category mean and the prior weigh equally.
    pub min_samples_leaf: f64,
    pub unknown_category: UnknownCategoryPolicy,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            smoothing: 1.0,
            min_samples_leaf: 20.0,
            unknown_category: UnknownCategoryPolicy::GlobalMean,
        }
    }
}

/// Learned statistic for one education level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    pub category: EducationLevel,
    pub count: usize,
    pub default_rate: f64,
    pub value: f64,
}

/// Fits [`EncodingTable`]s from labelled training rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetEncoder {
    settings: EncoderSettings,
}

impl TargetEncoder {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Compute the smoothed default rate of every education level present in `records`.
    pub fn fit(
        &self,
        records: &[ClientRecord],
        labels: &[u8],
    ) -> Result<EncodingTable, EncoderError> {
        if !(self.settings.smoothing > 0.0 && self.settings.smoothing.is_finite()) {
            return Err(EncoderError::InvalidSmoothing(self.settings.smoothing));
        }
        if records.is_empty() {
            return Err(EncoderError::Empty);
        }
        if records.len() != labels.len() {
            return Err(EncoderError::LengthMismatch {
                records: records.len(),
                labels: labels.len(),
            });
        }
        if let Some((index, &value)) = labels.iter().enumerate().find(|&(_, &label)| label > 1) {
            return Err(EncoderError::NonBinaryLabel { index, value });
        }

        let positives: usize = labels.iter().map(|&label| usize::from(label)).sum();
        let prior = positives as f64 / labels.len() as f64;

        let mut stats: BTreeMap<EducationLevel, (usize, usize)> = BTreeMap::new();
        for (record, &label) in records.iter().zip(labels) {
            let entry = stats.entry(record.education_level).or_default();
            entry.0 += 1;
            entry.1 += usize::from(label);
        }

        let categories = stats
            .into_iter()
            .map(|(category, (count, positives))| {
                let default_rate = positives as f64 / count as f64;
                CategoryEncoding {
                    category,
                    count,
                    default_rate,
                    value: self.blend(prior, default_rate, count),
                }
            })
            .collect();

        Ok(EncodingTable {
            prior,
            categories,
            settings: self.settings,
        })
    }

    fn blend(&self, prior: f64, category_mean: f64, count: usize) -> f64 {
        if count <= 1 {
            return prior;
        }
        let exponent = -(count as f64 - self.settings.min_samples_leaf) / self.settings.smoothing;
        let weight = 1.0 / (1.0 + exponent.exp());
        prior * (1.0 - weight) + category_mean * weight
    }
}

/// Immutable education-level lookup produced by [`TargetEncoder::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingTable {
    prior: f64,
    categories: Vec<CategoryEncoding>,
    settings: EncoderSettings,
}

impl EncodingTable {
    pub fn from_parts(
        prior: f64,
        categories: Vec<CategoryEncoding>,
        settings: EncoderSettings,
    ) -> Self {
        Self {
            prior,
            categories,
            settings,
        }
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn categories(&self) -> &[CategoryEncoding] {
        &self.categories
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Replace the unknown-category policy persisted with the table.
    pub fn with_unknown_category(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.settings.unknown_category = policy;
        self
    }

    /// Encoded value for `level`, applying the unknown-category policy.
    pub fn value(&self, level: EducationLevel) -> Result<f64, UnknownCategory> {
        if let Some(entry) = self.categories.iter().find(|entry| entry.category == level) {
            return Ok(entry.value);
        }

        match self.settings.unknown_category {
            UnknownCategoryPolicy::GlobalMean => {
                warn!(
                    category = %level,
                    prior = self.prior,
                    "education level unseen at fit time; using prior"
                );
                Ok(self.prior)
            }
            UnknownCategoryPolicy::Reject => Err(UnknownCategory { category: level }),
        }
    }

    /// Numeric model input for `record`, in schema column order.
    pub fn transform(&self, record: &ClientRecord) -> Result<FeatureVector, UnknownCategory> {
        let education = self.value(record.education_level)?;
        Ok(FeatureVector([
            f64::from(record.age),
            education,
            f64::from(record.years_employed),
            record.income,
            record.commercial_debt,
            record.credit_card_debt,
            record.other_debt,
            record.income_to_debt_ratio,
        ]))
    }

    /// Structural checks run when a table is read back from disk.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.prior) {
            return Err(format!("prior {} outside [0, 1]", self.prior));
        }
        if !(self.settings.smoothing > 0.0 && self.settings.smoothing.is_finite()) {
            return Err(format!("smoothing {} must be positive", self.settings.smoothing));
        }
        for entry in &self.categories {
            if !entry.value.is_finite() {
                return Err(format!("non-finite encoding for {}", entry.category));
            }
        }
        let mut seen: Vec<EducationLevel> =
            self.categories.iter().map(|entry| entry.category).collect();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.categories.len() {
            return Err("duplicate education level entries".to_string());
        }
        Ok(())
    }
}

/// Raised under [`UnknownCategoryPolicy::Reject`] for a level absent from the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("EducationLevel '{category}' was not present when the encoder was fitted")]
pub struct UnknownCategory {
    pub category: EducationLevel,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncoderError {
    #[error("cannot fit an encoder on zero rows")]
    Empty,
    #[error("{records} records but {labels} labels")]
    LengthMismatch { records: usize, labels: usize },
    #[error("label {value} at row {index} is not 0 or 1")]
    NonBinaryLabel { index: usize, value: u8 },
    #[error("smoothing must be a positive number (got {0})")]
    InvalidSmoothing(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(level: EducationLevel) -> ClientRecord {
        ClientRecord {
            age: 35,
            education_level: level,
            years_employed: 8,
            income: 60.0,
            commercial_debt: 1.5,
            credit_card_debt: 0.8,
            other_debt: 2.0,
            income_to_debt_ratio: 0.07,
        }
    }

    fn rows(level: EducationLevel, total: usize, positives: usize) -> (Vec<ClientRecord>, Vec<u8>) {
        let records = vec![record(level); total];
        let labels = (0..total).map(|i| u8::from(i < positives)).collect();
        (records, labels)
    }

    #[test]
    fn policy_override_applies_to_a_fitted_table() {
        let (records, labels) = rows(EducationLevel::Medium, 10, 4);
        let table = TargetEncoder::default()
            .fit(&records, &labels)
            .expect("encoder fits");
        assert_eq!(table.value(EducationLevel::Basic), Ok(table.prior()));

        let strict = table.with_unknown_category(UnknownCategoryPolicy::Reject);
        assert_eq!(strict.settings().unknown_category, UnknownCategoryPolicy::Reject);
        assert_eq!(
            strict.value(EducationLevel::Basic),
            Err(UnknownCategory {
                category: EducationLevel::Basic
            })
        );
        assert!(strict.value(EducationLevel::Medium).is_ok());
    }

    #[test]
    fn fit_blends_category_mean_with_prior() {
        let (mut records, mut labels) = rows(EducationLevel::Basic, 40, 20);
        let (more_records, more_labels) = rows(EducationLevel::Postgraduate, 20, 2);
        records.extend(more_records);
        labels.extend(more_labels);

        let settings = EncoderSettings {
            smoothing: 10.0,
            min_samples_leaf: 20.0,
            unknown_category: UnknownCategoryPolicy::GlobalMean,
        };
        let table = TargetEncoder::new(settings)
            .fit(&records, &labels)
            .expect("fit succeeds");

        let prior = 22.0 / 60.0;
        assert!((table.prior() - prior).abs() < 1e-12);

        // n == min_samples_leaf weighs category mean and prior equally.
        let postgraduate = table.value(EducationLevel::Postgraduate).unwrap();
        assert!((postgraduate - (0.5 * prior + 0.5 * 0.1)).abs() < 1e-12);

        let weight = 1.0 / (1.0 + (-(40.0 - 20.0) / 10.0_f64).exp());
        let basic = table.value(EducationLevel::Basic).unwrap();
        assert!((basic - (prior * (1.0 - weight) + 0.5 * weight)).abs() < 1e-12);
    }

    #[test]
    fn categories_seen_once_encode_to_prior() {
        let (mut records, mut labels) = rows(EducationLevel::Medium, 9, 3);
        records.push(record(EducationLevel::CompletedHigherEd));
        labels.push(1);
        let table = TargetEncoder::default().fit(&records, &labels).unwrap();
        assert_eq!(
            table.value(EducationLevel::CompletedHigherEd).unwrap(),
            table.prior()
        );
    }

    #[test]
    fn transform_preserves_schema_order() {
        let (records, labels) = rows(EducationLevel::Medium, 30, 6);
        let table = TargetEncoder::default().fit(&records, &labels).unwrap();
        let vector = table.transform(&records[0]).unwrap();
        let encoded = table.value(EducationLevel::Medium).unwrap();
        assert_eq!(
            vector.values(),
            &[35.0, encoded, 8.0, 60.0, 1.5, 0.8, 2.0, 0.07]
        );
        assert_eq!(table.transform(&records[0]).unwrap(), vector);
    }

    #[test]
    fn unknown_category_follows_policy() {
        let (records, labels) = rows(EducationLevel::Medium, 10, 5);
        let lenient = TargetEncoder::default().fit(&records, &labels).unwrap();
        assert_eq!(
            lenient.value(EducationLevel::Postgraduate).unwrap(),
            lenient.prior()
        );

        let strict = TargetEncoder::new(EncoderSettings {
            unknown_category: UnknownCategoryPolicy::Reject,
            ..EncoderSettings::default()
        })
        .fit(&records, &labels)
        .unwrap();
        let error = strict
            .transform(&record(EducationLevel::Postgraduate))
            .expect_err("strict table rejects unseen levels");
        assert_eq!(error.category, EducationLevel::Postgraduate);
    }

    #[test]
    fn fit_rejects_bad_inputs() {
        let encoder = TargetEncoder::default();
        assert_eq!(encoder.fit(&[], &[]).unwrap_err(), EncoderError::Empty);

        let (records, _) = rows(EducationLevel::Basic, 3, 0);
        assert!(matches!(
            encoder.fit(&records, &[0, 1]),
            Err(EncoderError::LengthMismatch { records: 3, labels: 2 })
        ));
        assert!(matches!(
            encoder.fit(&records, &[0, 2, 1]),
            Err(EncoderError::NonBinaryLabel { index: 1, value: 2 })
        ));

        let zero_smoothing = TargetEncoder::new(EncoderSettings {
            smoothing: 0.0,
            ..EncoderSettings::default()
        });
        assert!(matches!(
            zero_smoothing.fit(&records, &[0, 0, 1]),
            Err(EncoderError::InvalidSmoothing(_))
        ));
    }

    #[test]
    fn table_round_trips_through_json() {
        let (mut records, mut labels) = rows(EducationLevel::Basic, 25, 10);
        let (more_records, more_labels) = rows(EducationLevel::IncompleteHigherEd, 12, 1);
        records.extend(more_records);
        labels.extend(more_labels);
        let table = TargetEncoder::default().fit(&records, &labels).unwrap();

        let json = serde_json::to_string(&table).expect("serializes");
        let restored: EncodingTable = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(restored, table);
        for candidate in &records {
            assert_eq!(
                restored.transform(candidate).unwrap(),
                table.transform(candidate).unwrap()
            );
        }
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "mean".parse::<UnknownCategoryPolicy>(),
            Ok(UnknownCategoryPolicy::GlobalMean)
        );
        assert_eq!(
            " Reject ".parse::<UnknownCategoryPolicy>(),
            Ok(UnknownCategoryPolicy::Reject)
        );
        assert!("maybe".parse::<UnknownCategoryPolicy>().is_err());
    }
}
