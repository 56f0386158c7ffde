//! SQLite-based run history

use crate::core::{OverallStatus, PipelineRun};
use crate::persistence::{create_record, scope_key, PersistenceBackend, RunRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// SQLite run store
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open history database {}", db_path.display()))?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// A throwaway database, for tests
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Location used when no path is given
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quality-gate")
            .join("runs.db")
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let db_path = Self::default_path();
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Self::open(&db_path).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                pipeline_name TEXT NOT NULL,
                scope TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                coverage REAL,
                run_json TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create runs table")?;

        // Databases created before runs were keyed by scope
        let has_scope = sqlx::query("SELECT 1 FROM pragma_table_info('runs') WHERE name = 'scope'")
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if !has_scope {
            sqlx::query("ALTER TABLE runs ADD COLUMN scope TEXT NOT NULL DEFAULT ''")
                .execute(&self.pool)
                .await
                .context("Failed to add scope column")?;
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_pipeline ON runs(pipeline_name)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn status_label(status: OverallStatus) -> &'static str {
        match status {
            OverallStatus::Succeeded => "succeeded",
            OverallStatus::Failed => "failed",
        }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RunRecord> {
        let json: String = row.get("run_json");
        let run: PipelineRun =
            serde_json::from_str(&json).context("Corrupt run record in history database")?;
        let coverage: Option<f64> = row.get("coverage");
        Ok(create_record(&run, coverage))
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for SqliteRunStore {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        let json = serde_json::to_string(&record.run).context("Failed to serialize run")?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, pipeline_name, scope, status, started_at, coverage, run_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(record.run_id.to_string())
        .bind(&record.pipeline_name)
        .bind(scope_key(&record.scope))
        .bind(Self::status_label(record.status))
        .bind(Self::to_naive(record.started_at))
        .bind(record.coverage)
        .bind(json)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let row = sqlx::query("SELECT coverage, run_json FROM runs WHERE id = ?1")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load run")?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_runs(&self, pipeline_name: Option<&str>, limit: usize) -> Result<Vec<RunRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT coverage, run_json
            FROM runs
            WHERE ?1 IS NULL OR pipeline_name = ?1
            ORDER BY started_at DESC
            LIMIT ?2
            "#,
        )
        .bind(pipeline_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT pipeline_name
            FROM runs
            ORDER BY pipeline_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pipelines")?;

        Ok(rows.iter().map(|row| row.get("pipeline_name")).collect())
    }

    async fn coverage_baseline(&self, pipeline_name: &str, scope: &[String]) -> Result<Option<f64>> {
        let row = sqlx::query(
            r#"
            SELECT coverage
            FROM runs
            WHERE pipeline_name = ?1 AND scope = ?2
              AND status = 'succeeded' AND coverage IS NOT NULL
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(pipeline_name)
        .bind(scope_key(scope))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read coverage baseline")?;

        Ok(row.map(|row| row.get::<f64, _>("coverage")))
    }
}
