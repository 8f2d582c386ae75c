use crate::cli::ServeArgs;
use crate::infra::{load_pipeline, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credit_risk::config::AppConfig;
use credit_risk::error::AppError;
use credit_risk::scoring::PipelineState;
use credit_risk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(directory) = args.artifact_dir.take() {
        config.artifacts.directory = directory;
    }

    telemetry::init(&config.telemetry)?;

    let directory = &config.artifacts.directory;
    let pipeline = match load_pipeline(directory, config.artifacts.unknown_category) {
        Ok(pipeline) => {
            info!(
                directory = %directory.display(),
                model = %pipeline.model().kind,
                threshold = pipeline.threshold(),
                unknown_category = ?pipeline.encoder().settings().unknown_category,
                "scoring pipeline loaded"
            );
            PipelineState::from(pipeline)
        }
        Err(err) => {
            error!(
                directory = %directory.display(),
                error = %err,
                "model initialization failed"
            );
            if args.fail_fast {
                return Err(err.into());
            }
            PipelineState::Unavailable {
                reason: err.to_string().into(),
            }
        }
    };
    let model_ready = pipeline.is_ready();

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_service_routes(pipeline)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(model_ready, Ordering::Release);

    info!(?config.environment, %addr, ready = model_ready, "credit risk scoring service listening");

    axum::serve(listener, app).await?;
    Ok(())
}
