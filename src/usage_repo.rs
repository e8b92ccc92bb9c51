// SQLite store of API request events. Answers the histogram query for widgets.
// Uses sqlx for async + connection pooling; the rendered provider query must
// return rows (bucket INTEGER, total INTEGER).

use std::path::Path;
use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crate::models::{ApiRequest, Sample};
use crate::query::{QueryChannel, QueryError, QueryRequest};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Request counts per `{{per}}` bucket inside `[{{from}}, {{to}} + width)`.
pub const DEFAULT_HISTOGRAM_QUERY: &str = r#"
SELECT (requested_at / w.width) * w.width AS bucket, COUNT(*) AS total
FROM api_requests,
     (SELECT CASE '{{per}}'
                 WHEN 'SECONDS' THEN 1000
                 WHEN 'MINUTES' THEN 60000
                 ELSE 3600000
             END AS width) AS w
WHERE requested_at >= {{from}} AND requested_at < {{to}} + w.width
GROUP BY bucket
ORDER BY bucket
"#;

pub struct UsageRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl UsageRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        retention_days: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            retention_ms: retention_days as i64 * MS_PER_DAY,
        })
    }

    /// Create the events table and its time index if they don't exist.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                requested_at INTEGER NOT NULL,
                api_name TEXT NOT NULL,
                api_version TEXT NOT NULL,
                api_creator TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_api_requests_requested_at ON api_requests(requested_at)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, requests), fields(repo = "usage", operation = "record_requests", count = requests.len()))]
    pub async fn record_requests(&self, requests: &[ApiRequest]) -> anyhow::Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in requests {
            sqlx::query(
                "INSERT INTO api_requests (requested_at, api_name, api_version, api_creator) VALUES ($1, $2, $3, $4)",
            )
            .bind(r.requested_at)
            .bind(&r.api_name)
            .bind(&r.api_version)
            .bind(&r.api_creator)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "usage", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<u64> {
        let cutoff = chrono::Utc::now().timestamp_millis() - self.retention_ms;
        let result = sqlx::query("DELETE FROM api_requests WHERE requested_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_requests(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM api_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Runs a rendered histogram query and maps `(bucket, total)` rows to samples.
    #[instrument(skip(self, sql), fields(repo = "usage", operation = "histogram_query"))]
    pub async fn run_histogram_query(&self, sql: &str) -> anyhow::Result<Vec<Sample>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let bucket: i64 = row.try_get(0)?;
            let total: i64 = row.try_get(1)?;
            out.push(Sample::new(bucket, total));
        }
        Ok(out)
    }
}

impl QueryChannel for UsageRepo {
    async fn execute(&self, request: &QueryRequest) -> Result<Vec<Sample>, QueryError> {
        let sql = request.render();
        self.run_histogram_query(&sql)
            .await
            .map_err(|e| QueryError::Backend(format!("{:#}", e)))
    }
}
