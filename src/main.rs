mod config;
mod export;
mod logging;
mod models;
mod pipeline;
mod scheduler;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use chrono::Local;
use tracing::info;

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::scheduler::Plan;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let _log_guards = logging::init(&config.logging)?;

    let mode = config.schedule.run_mode()?;
    info!(
        "quotes-etl starting: {} pages from {} ({:?})",
        config.scraper.total_pages, config.scraper.base_url, mode
    );

    let pipeline = Pipeline::from_config(config)?;
    pipeline.store().ensure_schema()?;

    let plan = Plan::for_mode(mode, Local::now().naive_local());
    let pipeline = &pipeline;
    scheduler::dispatch(plan, move || async move {
        let report = pipeline.run().await?;
        info!(
            "Run finished: {} quotes | json: {} | csv: {} | {} rows inserted | {} previewed",
            report.quotes.len(),
            if report.json.is_ok() { "ok" } else { "failed" },
            if report.csv.is_ok() { "ok" } else { "failed" },
            report.inserted.unwrap_or(0),
            report.preview_rows,
        );
        Ok(())
    })
    .await
}
