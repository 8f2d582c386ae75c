use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of model inputs, categorical field included.
pub const FEATURE_COUNT: usize = 8;

/// Column order the encoder and classifiers are fitted with.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "EducationLevel",
    "YearsEmployed",
    "Income",
    "CommercialDebt",
    "CreditCardDebt",
    "OtherDebt",
    "IncomeToDebtRatio",
];

/// Highest education level reached by the applicant.
///
/// The short codes used by the original scoring sheets (`Bas`, `Med`, `SupInc`,
/// `SupCom`, `Posg`) are accepted on input; the long names are always emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(alias = "Bas")]
    Basic,
    #[serde(alias = "Med")]
    Medium,
    #[serde(alias = "SupInc")]
    IncompleteHigherEd,
    #[serde(alias = "SupCom")]
    CompletedHigherEd,
    #[serde(alias = "Posg")]
    Postgraduate,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 5] = [
        EducationLevel::Basic,
        EducationLevel::Medium,
        EducationLevel::IncompleteHigherEd,
        EducationLevel::CompletedHigherEd,
        EducationLevel::Postgraduate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            EducationLevel::Basic => "Basic",
            EducationLevel::Medium => "Medium",
            EducationLevel::IncompleteHigherEd => "IncompleteHigherEd",
            EducationLevel::CompletedHigherEd => "CompletedHigherEd",
            EducationLevel::Postgraduate => "Postgraduate",
        }
    }

    pub const fn short_code(self) -> &'static str {
        match self {
            EducationLevel::Basic => "Bas",
            EducationLevel::Medium => "Med",
            EducationLevel::IncompleteHigherEd => "SupInc",
            EducationLevel::CompletedHigherEd => "SupCom",
            EducationLevel::Postgraduate => "Posg",
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EducationLevel {
    type Err = SchemaViolation;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        EducationLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == trimmed || level.short_code() == trimmed)
            .ok_or_else(|| SchemaViolation::UnknownEducationLevel {
                value: trimmed.to_string(),
            })
    }
}

/// Raw request body before validation. Every field is optional so that a missing
/// field can be reported by name instead of as a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientRecordPayload {
    #[serde(rename = "Age", alias = "Edad", default)]
    pub age: Option<f64>,
    #[serde(rename = "EducationLevel", alias = "Nivel_Educacional", default)]
    pub education_level: Option<String>,
    #[serde(rename = "YearsEmployed", alias = "Años_Trabajando", default)]
    pub years_employed: Option<f64>,
    #[serde(rename = "Income", alias = "Ingresos", default)]
    pub income: Option<f64>,
    #[serde(rename = "CommercialDebt", alias = "Deuda_Comercial", default)]
    pub commercial_debt: Option<f64>,
    #[serde(rename = "CreditCardDebt", alias = "Deuda_Credito", default)]
    pub credit_card_debt: Option<f64>,
    #[serde(rename = "OtherDebt", alias = "Otras_Deudas", default)]
    pub other_debt: Option<f64>,
    #[serde(rename = "IncomeToDebtRatio", alias = "Ratio_Ingresos_Deudas", default)]
    pub income_to_debt_ratio: Option<f64>,
}

/// One applicant, validated against the scoring schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientRecord {
    pub age: u32,
    pub education_level: EducationLevel,
    pub years_employed: u32,
    pub income: f64,
    pub commercial_debt: f64,
    pub credit_card_debt: f64,
    pub other_debt: f64,
    pub income_to_debt_ratio: f64,
}

impl TryFrom<ClientRecordPayload> for ClientRecord {
    type Error = SchemaViolation;

    fn try_from(payload: ClientRecordPayload) -> Result<Self, Self::Error> {
        let age = whole_number(payload.age, "Age")?;
        if age <= 0.0 || age > f64::from(u32::MAX) {
            return Err(SchemaViolation::OutOfDomain {
                field: "Age",
                reason: format!("must be a positive integer (got {age})"),
            });
        }

        let education_level =
            required(payload.education_level, "EducationLevel")?.parse::<EducationLevel>()?;

        let years_employed = whole_number(payload.years_employed, "YearsEmployed")?;
        if years_employed < 0.0 || years_employed > f64::from(u32::MAX) {
            return Err(SchemaViolation::OutOfDomain {
                field: "YearsEmployed",
                reason: format!("must be zero or a positive integer (got {years_employed})"),
            });
        }

        Ok(Self {
            age: age as u32,
            education_level,
            years_employed: years_employed as u32,
            income: non_negative(payload.income, "Income")?,
            commercial_debt: non_negative(payload.commercial_debt, "CommercialDebt")?,
            credit_card_debt: non_negative(payload.credit_card_debt, "CreditCardDebt")?,
            other_debt: non_negative(payload.other_debt, "OtherDebt")?,
            income_to_debt_ratio: finite(payload.income_to_debt_ratio, "IncomeToDebtRatio")?,
        })
    }
}

impl From<&ClientRecord> for ClientRecordPayload {
    fn from(record: &ClientRecord) -> Self {
        Self {
            age: Some(f64::from(record.age)),
            education_level: Some(record.education_level.as_str().to_string()),
            years_employed: Some(f64::from(record.years_employed)),
            income: Some(record.income),
            commercial_debt: Some(record.commercial_debt),
            credit_card_debt: Some(record.credit_card_debt),
            other_debt: Some(record.other_debt),
            income_to_debt_ratio: Some(record.income_to_debt_ratio),
        }
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, SchemaViolation> {
    value.ok_or(SchemaViolation::MissingField { field })
}

fn finite(value: Option<f64>, field: &'static str) -> Result<f64, SchemaViolation> {
    let value = required(value, field)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SchemaViolation::OutOfDomain {
            field,
            reason: "must be a finite number".to_string(),
        })
    }
}

/// Integer fields arrive as JSON numbers; `56` and `56.0` are both accepted.
fn whole_number(value: Option<f64>, field: &'static str) -> Result<f64, SchemaViolation> {
    let value = finite(value, field)?;
    if value.fract() != 0.0 {
        return Err(SchemaViolation::OutOfDomain {
            field,
            reason: format!("must be a whole number (got {value})"),
        });
    }
    Ok(value)
}

fn non_negative(value: Option<f64>, field: &'static str) -> Result<f64, SchemaViolation> {
    let value = finite(value, field)?;
    if value < 0.0 {
        return Err(SchemaViolation::OutOfDomain {
            field,
            reason: format!("must be zero or greater (got {value})"),
        });
    }
    Ok(value)
}

/// Fully numeric model input in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

/// Raised when a request does not match the 8-field client shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("field `{field}` {reason}")]
    OutOfDomain { field: &'static str, reason: String },
    #[error(
        "field `EducationLevel` must be one of Basic, Medium, IncompleteHigherEd, CompletedHigherEd, Postgraduate (got '{value}')"
    )]
    UnknownEducationLevel { value: String },
    #[error("malformed request body: {0}")]
    Malformed(String),
}

impl SchemaViolation {
    /// Name of the offending field when the violation can be pinned to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SchemaViolation::MissingField { field } | SchemaViolation::OutOfDomain { field, .. } => {
                Some(*field)
            }
            SchemaViolation::UnknownEducationLevel { .. } => Some("EducationLevel"),
            SchemaViolation::Malformed(_) => None,
        }
    }
}
