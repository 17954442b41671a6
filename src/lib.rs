pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod scraping;
pub mod utils;

use anyhow::{Context, Result};
use tracing::{info, warn};

use config::AppConfig;
use db::{EventFilter, Store};
use models::StoredEvent;
use pipeline::{AdapterReport, Pipeline, RunSummary};

fn open_store(config: &AppConfig) -> Result<Store> {
    let path = config.database_path();
    Store::open(&path).with_context(|| format!("opening event store at {}", path.display()))
}

fn build_pipeline(config: &AppConfig) -> Result<Pipeline> {
    let region = config.region().context("resolving region")?;
    let store = open_store(config)?;
    let launcher = scraping::launcher_for(config);
    let adapters = scraping::active_adapters(config, &region, launcher);
    Ok(Pipeline::new(
        store,
        adapters,
        region,
        config.retention_days,
        config.adapter_timeout(),
    ))
}

pub fn list_sources(config: &AppConfig) -> Result<Vec<scraping::ScraperInfo>> {
    let region = config.region().context("resolving region")?;
    let adapters = scraping::active_adapters(config, &region, scraping::launcher_for(config));
    Ok(scraping::list_scrapers(&adapters))
}

pub async fn scrape_all(config: &AppConfig) -> Result<RunSummary> {
    let mut pipeline = build_pipeline(config)?;
    let summary = pipeline.run_all().await?;
    match pipeline.store().count_events(true) {
        Ok(active) => info!(active, "store after run"),
        Err(err) => warn!(error = %err, "failed to count stored events"),
    }
    Ok(summary)
}

pub async fn scrape_source(config: &AppConfig, source_id: &str) -> Result<AdapterReport> {
    let mut pipeline = build_pipeline(config)?;
    let report = pipeline.run_source(source_id).await?;
    Ok(report)
}

pub fn sweep_expired(config: &AppConfig) -> Result<usize> {
    let swept = build_pipeline(config)?.sweep()?;
    Ok(swept)
}

/// Active listings from today onward unless the filter says otherwise.
pub fn list_events(config: &AppConfig, mut filter: EventFilter) -> Result<Vec<StoredEvent>> {
    let region = config.region().context("resolving region")?;
    filter.from.get_or_insert_with(|| region.today());
    filter.active.get_or_insert(true);
    let store = open_store(config)?;
    let events = store.find_events(&filter).context("querying events")?;
    info!(count = events.len(), "listed events");
    Ok(events)
}
