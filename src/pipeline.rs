//! Runs every adapter, feeds what they return through normalization into the
//! store, then applies retention once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as Days, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Region;
use crate::db::{Store, UpsertOutcome};
use crate::models::RawRecord;
use crate::normalize::Normalizer;
use crate::scraping::SourceAdapter;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("event store unavailable: {0}")]
    StoreUnavailable(#[source] rusqlite::Error),
    #[error("retention sweep failed: {0}")]
    Sweep(#[source] rusqlite::Error),
    #[error("unknown source: {0}")]
    UnknownSource(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running { adapter: usize },
    Sweeping,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterStatus {
    Yielded,
    Empty,
    Crashed,
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterReport {
    pub id: String,
    pub status: AdapterStatus,
    /// Raw records the adapter returned.
    pub scraped: usize,
    /// Records that made it into the store.
    pub persisted: usize,
    pub created: usize,
    pub updated: usize,
    /// Records rejected by normalization.
    pub dropped: usize,
    /// Records the store refused.
    pub failed: usize,
}

impl AdapterReport {
    fn empty(id: &str, status: AdapterStatus) -> Self {
        Self {
            id: id.to_string(),
            status,
            scraped: 0,
            persisted: 0,
            created: 0,
            updated: 0,
            dropped: 0,
            failed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_records: usize,
    pub successful_adapters: usize,
    pub total_adapters: usize,
    pub duration_seconds: f64,
    pub success: bool,
    pub swept: usize,
    pub adapters: Vec<AdapterReport>,
}

pub struct Pipeline {
    store: Store,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    region: Region,
    retention_days: i64,
    adapter_timeout: Duration,
    phase: RunPhase,
}

impl Pipeline {
    pub fn new(
        store: Store,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        region: Region,
        retention_days: i64,
        adapter_timeout: Duration,
    ) -> Self {
        Self {
            store,
            adapters,
            region,
            retention_days,
            adapter_timeout,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    #[instrument(skip(self), fields(adapters = self.adapters.len()))]
    pub async fn run_all(&mut self) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        self.store.ping().map_err(PipelineError::StoreUnavailable)?;

        let normalizer = Normalizer::new(self.region.clone());
        let today = normalizer.today();
        let mut reports = Vec::with_capacity(self.adapters.len());

        for (idx, adapter) in self.adapters.clone().iter().enumerate() {
            self.phase = RunPhase::Running { adapter: idx };
            reports.push(self.run_adapter(adapter, &normalizer).await);
        }

        self.phase = RunPhase::Sweeping;
        let swept = self.sweep_with(today)?;
        self.phase = RunPhase::Done;

        let summary = summarize(reports, swept, started.elapsed());
        info!(
            total_records = summary.total_records,
            successful_adapters = summary.successful_adapters,
            total_adapters = summary.total_adapters,
            duration_seconds = summary.duration_seconds,
            swept,
            success = summary.success,
            "run finished"
        );
        Ok(summary)
    }

    /// One adapter through normalization and storage, without a sweep.
    pub async fn run_source(&mut self, id: &str) -> Result<AdapterReport, PipelineError> {
        self.store.ping().map_err(PipelineError::StoreUnavailable)?;
        let idx = self
            .adapters
            .iter()
            .position(|adapter| adapter.id().eq_ignore_ascii_case(id))
            .ok_or_else(|| PipelineError::UnknownSource(id.to_string()))?;
        let adapter = Arc::clone(&self.adapters[idx]);
        let normalizer = Normalizer::new(self.region.clone());
        self.phase = RunPhase::Running { adapter: idx };
        let report = self.run_adapter(&adapter, &normalizer).await;
        self.phase = RunPhase::Done;
        Ok(report)
    }

    /// Retention on its own, with the cutoff taken from the region's today.
    pub fn sweep(&self) -> Result<usize, PipelineError> {
        self.sweep_with(self.region.today())
    }

    fn sweep_with(&self, today: NaiveDate) -> Result<usize, PipelineError> {
        let cutoff = today - Days::days(self.retention_days);
        let swept = self.store.sweep(cutoff).map_err(PipelineError::Sweep)?;
        info!(%cutoff, swept, "retention sweep finished");
        Ok(swept)
    }

    async fn run_adapter(
        &self,
        adapter: &Arc<dyn SourceAdapter>,
        normalizer: &Normalizer,
    ) -> AdapterReport {
        let id = adapter.id();
        info!(adapter = id, "running adapter");

        let task_adapter = Arc::clone(adapter);
        let mut task = tokio::spawn(async move { task_adapter.scrape().await });

        let raws = match timeout(self.adapter_timeout, &mut task).await {
            Ok(Ok(raws)) => raws,
            Ok(Err(err)) => {
                error!(adapter = id, error = %err, "adapter crashed");
                return AdapterReport::empty(id, AdapterStatus::Crashed);
            }
            Err(_) => {
                task.abort();
                error!(
                    adapter = id,
                    limit_secs = self.adapter_timeout.as_secs(),
                    "adapter exceeded its time limit"
                );
                return AdapterReport::empty(id, AdapterStatus::TimedOut);
            }
        };

        let report = self.persist(id, raws, normalizer);
        info!(
            adapter = id,
            scraped = report.scraped,
            persisted = report.persisted,
            created = report.created,
            updated = report.updated,
            dropped = report.dropped,
            failed = report.failed,
            "adapter finished"
        );
        report
    }

    fn persist(&self, id: &str, raws: Vec<RawRecord>, normalizer: &Normalizer) -> AdapterReport {
        let mut report = AdapterReport::empty(id, AdapterStatus::Empty);
        report.scraped = raws.len();

        for raw in raws {
            let record = match normalizer.normalize(raw) {
                Ok(record) => record,
                Err(err) => {
                    warn!(adapter = id, error = %err, "dropping record");
                    report.dropped += 1;
                    continue;
                }
            };
            match self.store.upsert_event(&record) {
                Ok(outcome) => {
                    debug!(adapter = id, url = %record.original_url, ?outcome, "stored event");
                    report.persisted += 1;
                    match outcome {
                        UpsertOutcome::Created => report.created += 1,
                        UpsertOutcome::Updated => report.updated += 1,
                    }
                }
                Err(err) => {
                    warn!(adapter = id, url = %record.original_url, error = %err, "failed to store event");
                    report.failed += 1;
                }
            }
        }

        if report.persisted > 0 {
            report.status = AdapterStatus::Yielded;
        }
        report
    }
}

fn summarize(adapters: Vec<AdapterReport>, swept: usize, elapsed: Duration) -> RunSummary {
    let total_records = adapters.iter().map(|r| r.persisted).sum();
    let successful_adapters = adapters
        .iter()
        .filter(|r| r.status == AdapterStatus::Yielded)
        .count();
    RunSummary {
        total_records,
        successful_adapters,
        total_adapters: adapters.len(),
        duration_seconds: elapsed.as_secs_f64(),
        success: successful_adapters > 0,
        swept,
        adapters,
    }
}
