use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRoleDirectory};
use crate::routes::with_approval_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use caseflow::config::AppConfig;
use caseflow::error::AppError;
use caseflow::telemetry;
use caseflow::workflows::approval::blueprint;
use caseflow::workflows::approval::{
    ApprovalApi, ApprovalService, FormBinder, InMemoryInstanceStore, TemplateRegistry,
};
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

    let service = Arc::new(ApprovalService::new(
        TemplateRegistry::new(vec![blueprint::standard_template()]),
        FormBinder::standard(),
        blueprint::standard_permissions(),
        Arc::new(InMemoryInstanceStore::default()),
        config.engine.default_template.clone(),
    ));
    let api = ApprovalApi {
        service,
        directory: Arc::new(InMemoryRoleDirectory::seeded()),
    };

    let app = with_approval_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "approval workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
