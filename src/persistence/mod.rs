//! Persistence layer for run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use crate::core::{OverallStatus, PipelineRun};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored run with the figures used for listings and baselines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,

    pub pipeline_name: String,

    /// Paths the run was restricted to
    #[serde(default)]
    pub scope: Vec<String>,

    pub status: OverallStatus,

    pub cancelled: bool,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    pub duration_ms: u64,

    pub passed: usize,

    pub failed: usize,

    pub skipped: usize,

    /// Coverage percentage measured by this run, if any
    pub coverage: Option<f64>,

    /// The complete run, including captured output
    pub run: PipelineRun,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a run (replacing any record with the same id)
    async fn save_run(&self, record: &RunRecord) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>>;

    /// Most recent runs first, optionally for a single pipeline
    async fn list_runs(&self, pipeline_name: Option<&str>, limit: usize) -> Result<Vec<RunRecord>>;

    /// List all pipeline names
    async fn list_pipelines(&self) -> Result<Vec<String>>;

    /// Coverage of the most recent succeeded run over the same scope that
    /// measured it
    async fn coverage_baseline(&self, pipeline_name: &str, scope: &[String]) -> Result<Option<f64>>;
}

/// In-memory persistence (for testing or `--no-history` runs)
pub struct InMemoryPersistence {
    runs: tokio::sync::RwLock<Vec<RunRecord>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.retain(|r| r.run_id != record.run_id);
        runs.push(record.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let runs = self.runs.read().await;
        Ok(runs.iter().find(|r| r.run_id == run_id).cloned())
    }

    async fn list_runs(&self, pipeline_name: Option<&str>, limit: usize) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<RunRecord> = runs
            .iter()
            .filter(|r| pipeline_name.map_or(true, |name| r.pipeline_name == name))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let runs = self.runs.read().await;
        let mut names: Vec<String> = runs.iter().map(|r| r.pipeline_name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn coverage_baseline(&self, pipeline_name: &str, scope: &[String]) -> Result<Option<f64>> {
        let runs = self.runs.read().await;
        Ok(runs
            .iter()
            .filter(|r| {
                r.pipeline_name == pipeline_name
                    && r.scope == scope
                    && r.status == OverallStatus::Succeeded
                    && r.coverage.is_some()
            })
            .max_by_key(|r| r.started_at)
            .and_then(|r| r.coverage))
    }
}

/// Key under which a scope is stored, one path per line
pub fn scope_key(scope: &[String]) -> String {
    scope.join("\n")
}

/// Create a record from a finished run
pub fn create_record(run: &PipelineRun, coverage: Option<f64>) -> RunRecord {
    RunRecord {
        run_id: run.run_id,
        pipeline_name: run.pipeline_name.clone(),
        scope: run.scope.clone(),
        status: run.overall_status(),
        cancelled: run.cancelled,
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_ms: run.duration_ms(),
        passed: run.passed(),
        failed: run.failed(),
        skipped: run.skipped(),
        coverage,
        run: run.clone(),
    }
}
