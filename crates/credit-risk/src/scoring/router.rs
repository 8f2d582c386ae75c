use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::artifacts::ArtifactLoadError;
use super::pipeline::{InferencePipeline, PredictionError};
use super::schema::{ClientRecord, ClientRecordPayload, SchemaViolation};

/// Pipeline slot shared by the HTTP handlers.
#[derive(Debug, Clone)]
pub enum PipelineState {
    Ready(Arc<InferencePipeline>),
    Unavailable { reason: Arc<str> },
}

impl PipelineState {
    pub fn from_load(result: Result<InferencePipeline, ArtifactLoadError>) -> Self {
        match result {
            Ok(pipeline) => PipelineState::Ready(Arc::new(pipeline)),
            Err(err) => PipelineState::Unavailable {
                reason: err.to_string().into(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineState::Ready(_))
    }

    pub fn pipeline(&self) -> Option<&Arc<InferencePipeline>> {
        match self {
            PipelineState::Ready(pipeline) => Some(pipeline),
            PipelineState::Unavailable { .. } => None,
        }
    }
}

impl From<InferencePipeline> for PipelineState {
    fn from(pipeline: InferencePipeline) -> Self {
        PipelineState::Ready(Arc::new(pipeline))
    }
}

/// Body returned by a successful `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction_status: String,
    pub prediction_class: u8,
    pub probability_default: f64,
}

/// Router builder exposing the scoring endpoint.
pub fn prediction_router(state: PipelineState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .with_state(state)
}

pub(crate) async fn predict_handler(
    State(state): State<PipelineState>,
    body: Result<Json<ClientRecordPayload>, JsonRejection>,
) -> Response {
    let pipeline = match &state {
        PipelineState::Ready(pipeline) => pipeline,
        PipelineState::Unavailable { reason } => {
            error!(reason = %reason, "prediction requested but the model failed to initialize");
            let payload = json!({
                "error": "model initialization failed",
                "stage": "initialization",
                "detail": reason.as_ref(),
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
    };

    let record = match body {
        Ok(Json(payload)) => ClientRecord::try_from(payload),
        Err(rejection) => Err(SchemaViolation::Malformed(rejection.body_text())),
    };

    match record
        .map_err(PredictionError::from)
        .and_then(|record| pipeline.predict(&record))
    {
        Ok(outcome) => {
            info!(
                class = outcome.predicted_class,
                probability = outcome.probability_of_default,
                "prediction served"
            );
            let response = PredictionResponse {
                prediction_status: outcome.label_text.to_string(),
                prediction_class: outcome.predicted_class,
                probability_default: outcome.probability_of_default,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => prediction_error_response(&err),
    }
}

fn prediction_error_response(err: &PredictionError) -> Response {
    let status = if err.is_client_error() {
        warn!(stage = err.stage(), error = %err, "prediction request rejected");
        StatusCode::BAD_REQUEST
    } else {
        error!(stage = err.stage(), error = %err, "prediction failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let mut payload = Map::new();
    payload.insert("error".to_string(), Value::from(err.to_string()));
    payload.insert("stage".to_string(), Value::from(err.stage()));
    if let Some(field) = err.field() {
        payload.insert("field".to_string(), Value::from(field));
    }
    (status, Json(Value::Object(payload))).into_response()
}
