//! Runs exactly one optimization cycle and exits; meant for cron-style
//! external schedulers. Exit code 2 means the cycle aborted.

use affiliate_optimizer::{logging::init_tracing, AppConfig, Controller};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    let controller = Controller::from_config(&cfg)?;

    match controller.run_cycle().await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(aborted) => {
            tracing::error!(
                cycle_id = %aborted.cycle_id,
                stage = %aborted.stage,
                error = %aborted.error,
                "cycle aborted"
            );
            std::process::exit(2);
        }
    }
}
