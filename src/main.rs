use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use slotd::config::Config;
use slotd::engine::{Engine, InMemoryCatalog, TimeslotCatalog};
use slotd::holiday::{HolidayApiClient, HolidayCache};
use slotd::http::ReqwestFetcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    slotd::observability::init(config.metrics_port);

    let catalog = Arc::new(InMemoryCatalog::new());
    // A missing or broken catalog file is logged and leaves the catalog
    // empty; the daemon still starts.
    let _ = slotd::loader::bootstrap(catalog.as_ref(), &config.catalog_path);

    let fetcher = Arc::new(ReqwestFetcher::new(config.holiday_timeout));
    let client = HolidayApiClient::new(
        fetcher,
        config.holiday_api_url.clone(),
        config.holiday_api_key.clone(),
    );
    let holidays = Arc::new(HolidayCache::new(
        Arc::new(client),
        config.holiday_success_ttl,
        config.holiday_failure_ttl,
    ));

    let engine = Arc::new(Engine::in_memory(catalog.clone(), config.capacity, holidays));

    info!("slotd started");
    info!("  catalog: {} ({} timeslots)", config.catalog_path.display(), engine.catalog().len());
    info!("  capacity: {}/day, {}/timeslot", config.capacity.daily, config.capacity.timeslot);
    info!(
        "  holidays: {}",
        if config.holiday_api_key.trim().is_empty() { "disabled" } else { "enabled" }
    );
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let reloader = config.catalog_reload_interval.map(|every| {
        info!("  catalog reload: every {}s", every.as_secs());
        let catalog: Arc<dyn TimeslotCatalog> = catalog.clone();
        tokio::spawn(slotd::reloader::run_catalog_reloader(
            catalog,
            config.catalog_path.clone(),
            every,
        ))
    });

    // Run until SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    if let Some(task) = reloader {
        task.abort();
    }
    drop(engine);
    info!("slotd stopped");
    Ok(())
}
