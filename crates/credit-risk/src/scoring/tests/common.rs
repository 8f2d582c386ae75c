use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::{json, Value};

use crate::scoring::artifacts::ModelArtifact;
use crate::scoring::classifier::LogisticModel;
use crate::scoring::encoder::{
    CategoryEncoding, EncoderSettings, EncodingTable, UnknownCategoryPolicy,
};
use crate::scoring::pipeline::InferencePipeline;
use crate::scoring::schema::{ClientRecord, ClientRecordPayload, EducationLevel};

pub(super) const THRESHOLD: f64 = 0.45;

pub(super) fn example_payload() -> Value {
    json!({
        "Age": 56,
        "EducationLevel": "Postgraduate",
        "YearsEmployed": 16,
        "Income": 232.0,
        "CommercialDebt": 2.8,
        "CreditCardDebt": 2.1,
        "OtherDebt": 4.39,
        "IncomeToDebtRatio": 0.04
    })
}

pub(super) fn example_record() -> ClientRecord {
    let payload: ClientRecordPayload =
        serde_json::from_value(example_payload()).expect("payload decodes");
    ClientRecord::try_from(payload).expect("example is valid")
}

/// Regression set covering every education level the table was fitted on.
pub(super) fn regression_records() -> Vec<ClientRecord> {
    let levels = [
        EducationLevel::Medium,
        EducationLevel::IncompleteHigherEd,
        EducationLevel::CompletedHigherEd,
        EducationLevel::Postgraduate,
    ];
    levels
        .into_iter()
        .enumerate()
        .map(|(index, level)| ClientRecord {
            age: 25 + 9 * index as u32,
            education_level: level,
            years_employed: 2 + 3 * index as u32,
            income: 40.0 + 35.0 * index as f64,
            commercial_debt: 0.4 * (index + 1) as f64,
            credit_card_debt: 1.1,
            other_debt: 3.0 - 0.5 * index as f64,
            income_to_debt_ratio: 0.02 + 0.01 * index as f64,
        })
        .collect()
}

/// Table fitted without any `Basic` rows.
pub(super) fn encoding_table(policy: UnknownCategoryPolicy) -> EncodingTable {
    let entry = |category, count, default_rate, value| CategoryEncoding {
        category,
        count,
        default_rate,
        value,
    };
    EncodingTable::from_parts(
        0.28,
        vec![
            entry(EducationLevel::Medium, 120, 0.34, 0.3399),
            entry(EducationLevel::IncompleteHigherEd, 60, 0.3, 0.2987),
            entry(EducationLevel::CompletedHigherEd, 90, 0.22, 0.2203),
            entry(EducationLevel::Postgraduate, 30, 0.1, 0.1124),
        ],
        EncoderSettings {
            unknown_category: policy,
            ..EncoderSettings::default()
        },
    )
}

pub(super) fn model_artifact() -> ModelArtifact {
    let coefficients = [0.01, 2.0, -0.05, -0.004, 0.2, 0.15, 0.1, 1.0];
    ModelArtifact::new(LogisticModel::from_parts(-0.5, coefficients).into(), THRESHOLD)
}

pub(super) fn pipeline(policy: UnknownCategoryPolicy) -> InferencePipeline {
    InferencePipeline::new(encoding_table(policy), model_artifact())
}

pub(super) fn post_json(body: &Value) -> Request<Body> {
    Request::post("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn is_rounded_to_four_places(value: f64) -> bool {
    ((value * 10_000.0).round() / 10_000.0 - value).abs() < 1e-12
}
