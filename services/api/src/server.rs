use crate::cli::ServeArgs;
use crate::infra::{seeded_store, AppState};
use crate::routes::with_rehabilitation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rehab_ai::config::AppConfig;
use rehab_ai::error::AppError;
use rehab_ai::rehabilitation::{HttpPredictor, RehabilitationService, TracingEventPublisher};
use rehab_ai::telemetry;
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

    let store = seeded_store();
    let events = Arc::new(TracingEventPublisher);
    let predictor = HttpPredictor::new(&config.predictor)?;
    let service = Arc::new(RehabilitationService::new(predictor, store, events));

    let app = with_rehabilitation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rehabilitation recommendation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
