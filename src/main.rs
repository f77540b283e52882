//! Affiliate optimizer service: binary entrypoint.
//! Boots the Axum router (`/health`, `/run`, `/metrics`) and the interval
//! scheduler that triggers one optimization cycle per tick.

use affiliate_optimizer::{
    api::{self, AppState},
    logging::init_tracing,
    metrics::Metrics,
    scheduler::{spawn_scheduler, CycleGate},
    AppConfig, Controller,
};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    let metrics = Metrics::init()?;
    let controller = Controller::from_config(&cfg)?.into_shared();
    let gate = CycleGate::default();

    if cfg.scheduler.enabled {
        tracing::info!(interval_secs = cfg.scheduler.interval_secs, "starting scheduler");
        spawn_scheduler(controller.clone(), gate.clone(), cfg.scheduler.interval_secs);
    }

    let state = AppState::new(controller, gate).with_metrics(metrics.handle.clone());
    Ok(api::router(state).into())
}
