use crate::cli::ServeArgs;
use crate::infra::{cors_layer, shutdown_signal, AppState};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rentsite::checks::StatusCheckRepository;
use rentsite::config::AppConfig;
use rentsite::error::AppError;
use rentsite::rentals::{
    Clock, ExpirationSweeper, RentalLifecycleService, RentalRepository, SystemClock,
};
use rentsite::store::{MemoryStore, PgStore};
use rentsite::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    if config.database.is_memory() {
        warn!("DATABASE_URL selects the in-memory store; rentals will not survive a restart");
        return serve(&config, Arc::new(MemoryStore::new())).await;
    }

    let store = Arc::new(PgStore::connect(&config.database).await?);
    store.init().await?;
    info!(database = %config.database.name, "rental store connected");

    let served = serve(&config, store.clone()).await;
    store.close().await;
    served
}

async fn serve<R>(config: &AppConfig, store: Arc<R>) -> Result<(), AppError>
where
    R: RentalRepository + StatusCheckRepository + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(RentalLifecycleService::new(store.clone(), clock.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = ExpirationSweeper::new(store, clock, config.sweep.interval).spawn(shutdown_rx);

    let app = with_application_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rental microsite service ready");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    if shutdown_tx.send(true).is_err() {
        warn!("expiration sweeper exited before shutdown");
    }
    if let Err(err) = sweeper.await {
        warn!(error = %err, "expiration sweeper did not stop cleanly");
    }
    info!("rental microsite service stopped");

    served?;
    Ok(())
}
