// The staged pipeline: five sequential tasks plus the run orchestration.

pub mod tasks;

use crate::app::ports::{HttpClientPort, ObjectStorePort, Warehouse};
use crate::config::{PipelineConfig, StoreConfig};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tasks::{LoadSummary, TransformSummary};

/// The fixed object-store hand-off locations, threaded explicitly through
/// the stage calls so tests can point them at isolated buckets.
#[derive(Debug, Clone)]
pub struct Slots {
    pub bucket: String,
    pub staging_key: String,
    pub transformed_key: String,
}

impl Slots {
    pub fn from_config(store: &StoreConfig) -> Self {
        Self {
            bucket: store.bucket.clone(),
            staging_key: store.staging_key.clone(),
            transformed_key: store.transformed_key.clone(),
        }
    }
}

/// Tagged result of a transient-I/O stage (fetch, stage, publish). These
/// stages never raise; the orchestrator decides continue-vs-abort from the
/// outcome instead of the stage swallowing its own errors.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed { bytes: usize, checksum: String },
    Failed { error: String },
}

impl StageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub extract: Option<StageOutcome>,
    pub stage: Option<StageOutcome>,
    pub transform: Option<TransformSummary>,
    pub publish: Option<StageOutcome>,
    pub load: Option<LoadSummary>,
    /// Name of the stage that stopped the run, if any.
    pub aborted_at: Option<String>,
}

impl RunReport {
    fn new(run_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            extract: None,
            stage: None,
            transform: None,
            publish: None,
            load: None,
            aborted_at: None,
        }
    }
}

/// Runs all five stages in order against the given collaborators.
///
/// A failed transient-I/O stage aborts the run unless `keep_going` is set,
/// in which case downstream stages proceed against whatever the slots
/// currently hold -- possibly a previous run's artifact. Transform and load
/// errors always abort by propagating.
pub async fn run_pipeline(
    http: &dyn HttpClientPort,
    store: &dyn ObjectStorePort,
    warehouse: &dyn Warehouse,
    config: &PipelineConfig,
    keep_going: bool,
) -> Result<RunReport> {
    let slots = Slots::from_config(&config.store);
    let run_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let mut report = RunReport::new(run_id.clone(), started_at);
    info!(%run_id, bucket = %slots.bucket, "Starting pipeline run");

    let extract = tasks::extract(http, &config.source_url, &config.raw_path()).await;
    let extract_failed = extract.is_failed();
    report.extract = Some(extract);
    if extract_failed && !abort_or_continue("extract", keep_going, &mut report) {
        return finish(report);
    }

    let stage = tasks::stage(store, &config.raw_path(), &slots).await;
    let stage_failed = stage.is_failed();
    report.stage = Some(stage);
    if stage_failed && !abort_or_continue("stage", keep_going, &mut report) {
        return finish(report);
    }

    report.transform = Some(tasks::transform(store, &slots, &config.transformed_path()).await?);

    let publish = tasks::publish(store, &config.transformed_path(), &slots).await;
    let publish_failed = publish.is_failed();
    report.publish = Some(publish);
    if publish_failed && !abort_or_continue("publish", keep_going, &mut report) {
        return finish(report);
    }

    report.load = Some(tasks::load(store, warehouse, &slots).await?);

    finish(report)
}

/// Returns true when the run should continue past a failed stage.
fn abort_or_continue(stage: &str, keep_going: bool, report: &mut RunReport) -> bool {
    if keep_going {
        // Downstream stages now consume whatever the slots hold, which may
        // be a previous run's artifact or nothing at all.
        warn!(stage, "Stage failed; continuing against possibly stale slots");
        true
    } else {
        warn!(stage, "Stage failed; aborting run");
        report.aborted_at = Some(stage.to_string());
        false
    }
}

fn finish(mut report: RunReport) -> Result<RunReport> {
    report.finished_at = Utc::now();
    match &report.aborted_at {
        Some(stage) => warn!(run_id = %report.run_id, stage = %stage, "Pipeline run aborted"),
        None => info!(run_id = %report.run_id, "Pipeline run complete"),
    }
    Ok(report)
}
