//! SQLite storage backend implementations.
//!
//! Provides [`SqliteContentStore`] for report documents and
//! [`SqliteIndexStore`] for metadata records, both backed by a SQLite
//! connection pool (shareable between the two). The metadata table carries
//! covering indexes for the two predeclared secondary orderings, and the
//! scan filter is compiled to a dynamic `WHERE` clause so the backend
//! evaluates it natively.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reportvault_core::{
    ContentStore, EncryptionStatus, FindingSeverity, IndexStore, KeyCondition, MetadataUpdate,
    ReportId, ReportMetadata, ReportStatus, ReportType, ReportVaultError, Result, ScanFilter,
    SeverityCounts, StorageTier,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Schema migrations
// ---------------------------------------------------------------------------

const CONTENT_MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS content_objects (
        object_key TEXT NOT NULL PRIMARY KEY,
        body BLOB NOT NULL,
        content_type TEXT NOT NULL,
        tier TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )",
];

const INDEX_MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS report_metadata (
        report_id TEXT NOT NULL PRIMARY KEY,
        report_type TEXT NOT NULL,
        generated_at TEXT NOT NULL,
        content_key TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        findings_count INTEGER NOT NULL,
        severity_low INTEGER NOT NULL DEFAULT 0,
        severity_medium INTEGER NOT NULL DEFAULT 0,
        severity_high INTEGER NOT NULL DEFAULT 0,
        severity_critical INTEGER NOT NULL DEFAULT 0,
        finding_type_counts TEXT NOT NULL DEFAULT '{}',
        overall_score REAL,
        compliance_score REAL,
        status TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        departments TEXT NOT NULL DEFAULT '',
        searchable_text TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        last_modified TEXT NOT NULL,
        last_accessed TEXT,
        last_validated TEXT,
        expires_at TEXT NOT NULL
    )",
    // One covering index per predeclared secondary ordering
    "CREATE INDEX IF NOT EXISTS idx_metadata_type_generated
        ON report_metadata(report_type, generated_at)",
    "CREATE INDEX IF NOT EXISTS idx_metadata_status_generated
        ON report_metadata(status, generated_at)",
];

// ---------------------------------------------------------------------------
// Shared pool builder
// ---------------------------------------------------------------------------

/// Open (or create) a SQLite connection pool configured for ReportVault.
pub async fn open_pool(database_url: &str) -> Result<SqlitePool> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| ReportVaultError::IndexStore(format!("Invalid database URL: {e}")))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    // For in-memory databases every connection gets its own database, so
    // restrict the pool to a single connection to keep a consistent view.
    let max_conns: u32 = if database_url.contains(":memory:") {
        1
    } else {
        10
    };

    sqlx::pool::PoolOptions::<Sqlite>::new()
        .max_connections(max_conns)
        .connect_with(connect_opts)
        .await
        .map_err(|e| ReportVaultError::IndexStore(format!("Failed to connect to SQLite: {e}")))
}

/// Run a list of migration statements against the given pool.
async fn run_migrations(pool: &SqlitePool, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| ReportVaultError::IndexStore(format!("Migration failed: {e}")))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Serialisation helpers
// ---------------------------------------------------------------------------

/// Render a timestamp as fixed-width RFC 3339 UTC (microsecond precision)
/// so lexicographic TEXT comparison matches chronological order.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a [`DateTime<Utc>`] from an RFC 3339 TEXT column value.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ReportVaultError::IndexStore(format!("Invalid datetime '{s}': {e}")))
}

/// Parse a closed-enum TEXT column value via its `FromStr`.
fn parse_enum<T: FromStr<Err = String>>(s: &str) -> Result<T> {
    T::from_str(s).map_err(ReportVaultError::IndexStore)
}

/// Lower-cased, space-joined department facets, denormalized into a
/// dedicated column so the scan filter's substring predicate runs natively.
fn departments_column(record: &ReportMetadata) -> String {
    record
        .tags
        .iter()
        .filter_map(|t| t.strip_prefix("department:"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Row ↔ ReportMetadata conversion
// ---------------------------------------------------------------------------

/// Reconstruct a [`ReportMetadata`] from a SQLite row.
fn metadata_from_row(row: &SqliteRow) -> Result<ReportMetadata> {
    let report_id = ReportId::from(row.get::<String, _>("report_id"));
    let report_type: ReportType = parse_enum(&row.get::<String, _>("report_type"))?;
    let generated_at = parse_datetime(&row.get::<String, _>("generated_at"))?;
    let status: ReportStatus = parse_enum(&row.get::<String, _>("status"))?;

    let severity_counts = SeverityCounts {
        low: row.get::<i64, _>("severity_low") as u32,
        medium: row.get::<i64, _>("severity_medium") as u32,
        high: row.get::<i64, _>("severity_high") as u32,
        critical: row.get::<i64, _>("severity_critical") as u32,
    };

    let finding_type_counts: HashMap<String, u32> = {
        let raw: String = row.get("finding_type_counts");
        serde_json::from_str(&raw).map_err(|e| {
            ReportVaultError::IndexStore(format!("Invalid finding_type_counts JSON: {e}"))
        })?
    };
    let tags: Vec<String> = {
        let raw: String = row.get("tags");
        serde_json::from_str(&raw)
            .map_err(|e| ReportVaultError::IndexStore(format!("Invalid tags JSON: {e}")))?
    };

    let last_accessed = row
        .get::<Option<String>, _>("last_accessed")
        .map(|s| parse_datetime(&s))
        .transpose()?;
    let last_validated = row
        .get::<Option<String>, _>("last_validated")
        .map(|s| parse_datetime(&s))
        .transpose()?;

    Ok(ReportMetadata {
        report_id,
        report_type,
        generated_at,
        content_key: row.get("content_key"),
        size_bytes: row.get::<i64, _>("size_bytes") as u64,
        findings_count: row.get::<i64, _>("findings_count") as u32,
        severity_counts,
        finding_type_counts,
        overall_score: row.get("overall_score"),
        compliance_score: row.get("compliance_score"),
        status,
        tags,
        searchable_text: row.get("searchable_text"),
        content_hash: row.get("content_hash"),
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        last_modified: parse_datetime(&row.get::<String, _>("last_modified"))?,
        last_accessed,
        last_validated,
        expires_at: parse_datetime(&row.get::<String, _>("expires_at"))?,
    })
}

// ===========================================================================
// SqliteContentStore
// ===========================================================================

/// SQLite-backed content store.
///
/// Stores full report documents as BLOBs keyed by content key, with tier,
/// content-type, and object-tag columns. SQLite applies no at-rest
/// encryption of its own, so puts report [`EncryptionStatus::None`].
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    /// Open (or create) a SQLite database and run content schema migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = open_pool(database_url).await?;
        Self::from_pool(pool).await
    }

    /// Create from an existing pool (used by the [`StorageProfile`] factory).
    ///
    /// [`StorageProfile`]: crate::StorageProfile
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        run_migrations(&pool, CONTENT_MIGRATIONS).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        tier: StorageTier,
        tags: &HashMap<String, String>,
    ) -> Result<EncryptionStatus> {
        let tags_json = serde_json::to_string(tags)
            .map_err(|e| ReportVaultError::ContentStore(format!("serialize tags: {e}")))?;

        sqlx::query(
            "INSERT OR REPLACE INTO content_objects
                (object_key, body, content_type, tier, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(key)
        .bind(bytes)
        .bind(content_type)
        .bind(tier.to_string())
        .bind(&tags_json)
        .bind(format_datetime(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| ReportVaultError::ContentStore(format!("Failed to put object: {e}")))?;

        Ok(EncryptionStatus::None)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT body FROM content_objects WHERE object_key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ReportVaultError::ContentStore(format!("Failed to get object: {e}")))?;

        Ok(row.map(|r| r.get::<Vec<u8>, _>("body")))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content_objects WHERE object_key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| ReportVaultError::ContentStore(format!("Failed to delete object: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_tier(&self, key: &str, tier: StorageTier) -> Result<()> {
        let result = sqlx::query("UPDATE content_objects SET tier = ?1 WHERE object_key = ?2")
            .bind(tier.to_string())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| ReportVaultError::ContentStore(format!("Failed to set tier: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(ReportVaultError::ContentStore(format!(
                "unknown content key: {key}"
            )));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ReportVaultError::ContentStore(format!("Health check failed: {e}")))?;
        Ok(())
    }
}

// ===========================================================================
// SqliteIndexStore
// ===========================================================================

/// SQLite-backed metadata index.
///
/// The primary key enforces the create-only write; the two covering indexes
/// serve [`KeyCondition`] range queries without a table scan.
pub struct SqliteIndexStore {
    pool: SqlitePool,
}

impl SqliteIndexStore {
    /// Open (or create) a SQLite database and run index schema migrations.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> reportvault_core::Result<()> {
    /// let index = reportvault_storage::SqliteIndexStore::new("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = open_pool(database_url).await?;
        Self::from_pool(pool).await
    }

    /// Create from an existing pool (used by the [`StorageProfile`] factory).
    ///
    /// [`StorageProfile`]: crate::StorageProfile
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        run_migrations(&pool, INDEX_MIGRATIONS).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn put_if_absent(&self, record: &ReportMetadata) -> Result<()> {
        let finding_type_counts_json = serde_json::to_string(&record.finding_type_counts)
            .map_err(|e| {
                ReportVaultError::IndexStore(format!("serialize finding_type_counts: {e}"))
            })?;
        let tags_json = serde_json::to_string(&record.tags)
            .map_err(|e| ReportVaultError::IndexStore(format!("serialize tags: {e}")))?;

        sqlx::query(
            "INSERT INTO report_metadata (
                report_id, report_type, generated_at, content_key, size_bytes,
                findings_count, severity_low, severity_medium, severity_high,
                severity_critical, finding_type_counts, overall_score,
                compliance_score, status, tags, departments, searchable_text,
                content_hash, created_at, last_modified, last_accessed,
                last_validated, expires_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21,
                ?22, ?23
            )",
        )
        .bind(record.report_id.as_str())
        .bind(record.report_type.to_string())
        .bind(format_datetime(record.generated_at))
        .bind(&record.content_key)
        .bind(record.size_bytes as i64)
        .bind(record.findings_count as i64)
        .bind(record.severity_counts.low as i64)
        .bind(record.severity_counts.medium as i64)
        .bind(record.severity_counts.high as i64)
        .bind(record.severity_counts.critical as i64)
        .bind(&finding_type_counts_json)
        .bind(record.overall_score)
        .bind(record.compliance_score)
        .bind(record.status.to_string())
        .bind(&tags_json)
        .bind(departments_column(record))
        .bind(&record.searchable_text)
        .bind(&record.content_hash)
        .bind(format_datetime(record.created_at))
        .bind(format_datetime(record.last_modified))
        .bind(record.last_accessed.map(format_datetime))
        .bind(record.last_validated.map(format_datetime))
        .bind(format_datetime(record.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ReportVaultError::AlreadyExists {
                    report_id: record.report_id.to_string(),
                }
            }
            _ => ReportVaultError::IndexStore(format!("Failed to insert metadata: {e}")),
        })?;

        Ok(())
    }

    async fn get(&self, report_id: &ReportId) -> Result<Option<ReportMetadata>> {
        let row = sqlx::query("SELECT * FROM report_metadata WHERE report_id = ?1")
            .bind(report_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ReportVaultError::IndexStore(format!("Failed to get metadata: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(metadata_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, report_id: &ReportId, update: &MetadataUpdate) -> Result<()> {
        if update.status.is_none()
            && update.last_accessed.is_none()
            && update.last_validated.is_none()
            && update.last_modified.is_none()
        {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE report_metadata SET ");
        let mut sep = qb.separated(", ");
        if let Some(status) = update.status {
            sep.push("status = ");
            sep.push_bind_unseparated(status.to_string());
        }
        if let Some(t) = update.last_accessed {
            sep.push("last_accessed = ");
            sep.push_bind_unseparated(format_datetime(t));
        }
        if let Some(t) = update.last_validated {
            sep.push("last_validated = ");
            sep.push_bind_unseparated(format_datetime(t));
        }
        if let Some(t) = update.last_modified {
            sep.push("last_modified = ");
            sep.push_bind_unseparated(format_datetime(t));
        }
        qb.push(" WHERE report_id = ");
        qb.push_bind(report_id.as_str());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| ReportVaultError::IndexStore(format!("Failed to update metadata: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(ReportVaultError::NotFound {
                report_id: report_id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, report_id: &ReportId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM report_metadata WHERE report_id = ?1")
            .bind(report_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| ReportVaultError::IndexStore(format!("Failed to delete metadata: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_by_index(
        &self,
        condition: &KeyCondition,
        limit: Option<u32>,
    ) -> Result<Vec<ReportMetadata>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM report_metadata WHERE ");
        match condition {
            KeyCondition::TypeInRange {
                report_type,
                start,
                end,
            } => {
                qb.push("report_type = ");
                qb.push_bind(report_type.to_string());
                qb.push(" AND generated_at >= ");
                qb.push_bind(format_datetime(*start));
                qb.push(" AND generated_at <= ");
                qb.push_bind(format_datetime(*end));
            }
            KeyCondition::StatusInRange { status, start, end } => {
                qb.push("status = ");
                qb.push_bind(status.to_string());
                qb.push(" AND generated_at >= ");
                qb.push_bind(format_datetime(*start));
                qb.push(" AND generated_at <= ");
                qb.push_bind(format_datetime(*end));
            }
        }
        qb.push(" ORDER BY generated_at ASC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit as i64);
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReportVaultError::IndexStore(format!("Failed to query index: {e}")))?;

        rows.iter().map(metadata_from_row).collect()
    }

    async fn scan(&self, filter: &ScanFilter, limit: Option<u32>) -> Result<Vec<ReportMetadata>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM report_metadata WHERE 1 = 1");

        if let Some(ref needle) = filter.department_contains {
            qb.push(" AND departments LIKE ");
            qb.push_bind(format!("%{}%", needle.to_lowercase()));
        }
        if let Some(min) = filter.min_score {
            qb.push(" AND COALESCE(overall_score, compliance_score) >= ");
            qb.push_bind(min);
        }
        if let Some(max) = filter.max_findings {
            qb.push(" AND findings_count <= ");
            qb.push_bind(max as i64);
        }
        if let Some(severity) = filter.has_severity {
            qb.push(match severity {
                FindingSeverity::Low => " AND severity_low > 0",
                FindingSeverity::Medium => " AND severity_medium > 0",
                FindingSeverity::High => " AND severity_high > 0",
                FindingSeverity::Critical => " AND severity_critical > 0",
            });
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status.to_string());
        }
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit as i64);
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReportVaultError::IndexStore(format!("Failed to scan metadata: {e}")))?;

        rows.iter().map(metadata_from_row).collect()
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ReportVaultError::IndexStore(format!("Health check failed: {e}")))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
