use chrono::Utc;
use rentsite::config::AppConfig;
use rentsite::error::AppError;
use rentsite::rentals::sweep_expired;
use rentsite::store::PgStore;
use rentsite::telemetry;

/// One-shot expiration sweep against the configured database, for cron-style
/// deployments that do not keep the server's background sweeper running.
pub(crate) async fn run_sweep() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    if config.database.is_memory() {
        println!("In-memory store holds no rentals between runs; nothing to sweep");
        return Ok(());
    }

    let store = PgStore::connect(&config.database).await?;
    store.init().await?;
    let swept = sweep_expired(&store, Utc::now()).await;
    store.close().await;

    let removed = swept?;
    println!("Removed {removed} expired rental(s)");
    Ok(())
}
