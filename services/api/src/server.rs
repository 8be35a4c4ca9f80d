use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAuditLog, InMemoryShiftRepository};
use crate::routes::with_engine_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use shift_guarantee::config::AppConfig;
use shift_guarantee::error::AppError;
use shift_guarantee::ledger::GuaranteeService;
use shift_guarantee::telemetry;
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

    let repository = Arc::new(InMemoryShiftRepository::default());
    let audit = Arc::new(InMemoryAuditLog::default());
    let guarantee_service = Arc::new(GuaranteeService::new(
        repository,
        audit,
        config.guarantee.clone(),
    ));

    let app = with_engine_routes(guarantee_service, Arc::new(config.guarantee.clone()))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        threshold = config.guarantee.threshold.ratio(),
        "shift guarantee service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
