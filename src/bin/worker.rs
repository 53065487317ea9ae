use std::env;
use std::time::Duration;

use fedspend::config::Settings;
use fedspend::jobs::{run_fix_award_ids, run_link_file_c, run_update_awards};
use sea_orm::Database;
use tokio::time::interval;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    // Command-line flags
    let args: Vec<String> = env::args().collect();
    let flag = |name: &str| args.iter().any(|a| a == name);

    let db = Database::connect(&settings.database_url).await?;

    // One-shot repairs run in this order and exit
    let mut ran_once = false;
    if flag("--fix-award-ids") {
        let summary = run_fix_award_ids(&db).await?;
        info!(?summary, "fix-award-ids finished");
        ran_once = true;
    }
    if flag("--link-file-c-file-d") {
        let summary = run_link_file_c(&db).await?;
        info!(?summary, "link-file-c-file-d finished");
        ran_once = true;
    }
    if flag("--update-awards") {
        let summary = run_update_awards(&db).await?;
        info!(?summary, "update-awards finished");
        ran_once = true;
    }
    if ran_once {
        return Ok(());
    }

    let minutes = settings.worker_interval_minutes.max(1);
    info!("Worker starting; reconciling awards every {} minutes", minutes);

    let mut ticker = interval(Duration::from_secs(minutes * 60));
    loop {
        ticker.tick().await;
        info!("Running scheduled jobs...");

        match run_update_awards(&db).await {
            Ok(summary) => info!(?summary, "update-awards finished"),
            Err(e) => error!(error = %e, "update-awards job failed"),
        }
    }
}
