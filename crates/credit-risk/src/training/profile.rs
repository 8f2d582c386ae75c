use std::fmt;

use serde::Serialize;

use super::dataset::LabeledDataset;
use crate::scoring::{ClientRecord, EducationLevel};

/// Default rate of one education level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProfile {
    pub category: EducationLevel,
    pub count: usize,
    pub default_rate: f64,
}

/// Summary statistics of one numeric column; `std` is the sample deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: &'static str,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Exploratory overview of a labelled dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub duplicates_dropped: usize,
    pub default_rate: f64,
    pub categories: Vec<CategoryProfile>,
    pub columns: Vec<ColumnProfile>,
}

const NUMERIC_COLUMNS: [&str; 7] = [
    "Age",
    "YearsEmployed",
    "Income",
    "CommercialDebt",
    "CreditCardDebt",
    "OtherDebt",
    "IncomeToDebtRatio",
];

fn numeric_values(record: &ClientRecord) -> [f64; 7] {
    [
        f64::from(record.age),
        f64::from(record.years_employed),
        record.income,
        record.commercial_debt,
        record.credit_card_debt,
        record.other_debt,
        record.income_to_debt_ratio,
    ]
}

impl DatasetProfile {
    pub fn from_dataset(dataset: &LabeledDataset) -> Self {
        let categories = EducationLevel::ALL
            .into_iter()
            .filter_map(|category| {
                let labels: Vec<u8> = dataset
                    .records()
                    .iter()
                    .zip(dataset.labels())
                    .filter(|(record, _)| record.education_level == category)
                    .map(|(_, &label)| label)
                    .collect();
                if labels.is_empty() {
                    return None;
                }
                let positives = labels.iter().filter(|&&label| label == 1).count();
                Some(CategoryProfile {
                    category,
                    count: labels.len(),
                    default_rate: positives as f64 / labels.len() as f64,
                })
            })
            .collect();

        let rows: Vec<[f64; 7]> = dataset.records().iter().map(numeric_values).collect();
        let columns = NUMERIC_COLUMNS
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let values: Vec<f64> = rows.iter().map(|row| row[index]).collect();
                column_profile(name, &values)
            })
            .collect();

        Self {
            rows: dataset.len(),
            duplicates_dropped: dataset.duplicates_dropped(),
            default_rate: dataset.default_rate(),
            categories,
            columns,
        }
    }
}

fn column_profile(name: &'static str, values: &[f64]) -> ColumnProfile {
    let count = values.len();
    if count == 0 {
        return ColumnProfile {
            name,
            count,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        };
    }

    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
        (squares / (count - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    ColumnProfile {
        name,
        count,
        mean,
        std,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

impl fmt::Display for DatasetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "rows: {} (duplicates dropped: {})",
            self.rows, self.duplicates_dropped
        )?;
        writeln!(f, "default rate: {:.4}", self.default_rate)?;
        writeln!(f)?;
        writeln!(f, "{:<20} {:>7} {:>12}", "education level", "count", "default rate")?;
        for category in &self.categories {
            writeln!(
                f,
                "{:<20} {:>7} {:>12.4}",
                category.category.as_str(),
                category.count,
                category.default_rate
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:<20} {:>7} {:>10} {:>10} {:>10} {:>10}",
            "column", "count", "mean", "std", "min", "max"
        )?;
        for column in &self.columns {
            writeln!(
                f,
                "{:<20} {:>7} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
                column.name, column.count, column.mean, column.std, column.min, column.max
            )?;
        }
        Ok(())
    }
}
