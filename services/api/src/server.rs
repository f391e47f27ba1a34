use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRequestStore, LoggingPermissionService};
use crate::routes::with_review_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use legal_review::config::AppConfig;
use legal_review::error::AppError;
use legal_review::telemetry;
use legal_review::workflows::review::{ReviewWorkflowEngine, StaticWorkingHours};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = InMemoryRequestStore::default();
    let engine = Arc::new(ReviewWorkflowEngine::new(
        Arc::new(store.clone()),
        Arc::new(LoggingPermissionService),
        Arc::new(StaticWorkingHours::new(config.working_hours.clone())),
    ));

    let app = with_review_routes(engine)
        .layer(Extension(app_state))
        .layer(Extension(store))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        work_start = config.working_hours.start_hour,
        work_end = config.working_hours.end_hour,
        "legal review workflow ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
