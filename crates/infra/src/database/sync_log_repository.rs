//! SQLite-backed sync log store: log entries and per-run statistics.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daosync_core::SyncLogRepository as SyncLogRepositoryPort;
use daosync_domain::{DaoSyncError, LogEntry, LogLevel, Result as DomainResult, SyncRunStats};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{from_millis, map_join_error, map_sql_error, to_millis, DbManager};

/// SQLite-backed implementation of `SyncLogRepository`
pub struct SqliteSyncLogRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncLogRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncLogRepositoryPort for SqliteSyncLogRepository {
    async fn append_entry(&self, entry: &LogEntry) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let context = entry.context.as_ref().map(ToString::to_string);
        let entry = entry.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_log_entries (timestamp, level, message, context)
                 VALUES (?1, ?2, ?3, ?4)",
                params![to_millis(entry.timestamp), entry.level.as_str(), entry.message, context],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn recent_entries(&self, limit: usize) -> DomainResult<Vec<LogEntry>> {
        let db = Arc::clone(&self.db);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        task::spawn_blocking(move || -> DomainResult<Vec<LogEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT timestamp, level, message, context FROM sync_log_entries
                     ORDER BY timestamp DESC, id DESC LIMIT ?1",
                )
                .map_err(map_sql_error)?;

            let entries = stmt
                .query_map(params![limit], map_entry_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(entries)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_run_stats(&self, stats: &SyncRunStats) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let errors = encode_messages(&stats.errors)?;
        let warnings = encode_messages(&stats.warnings)?;
        let stats = stats.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_runs (
                    started_at, duration_ms, accounts_processed, posts_updated, posts_added,
                    api_requests, errors, warnings
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    to_millis(stats.started_at),
                    i64::try_from(stats.duration_ms).unwrap_or(i64::MAX),
                    stats.accounts_processed,
                    stats.posts_updated,
                    stats.posts_added,
                    stats.api_requests,
                    errors,
                    warnings,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn run_stats_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<SyncRunStats>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncRunStats>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT started_at, duration_ms, accounts_processed, posts_updated,
                            posts_added, api_requests, errors, warnings
                     FROM sync_runs WHERE started_at BETWEEN ?1 AND ?2
                     ORDER BY started_at, id",
                )
                .map_err(map_sql_error)?;

            let runs = stmt
                .query_map(params![to_millis(start), to_millis(end)], map_run_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(runs)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            let cutoff = to_millis(cutoff);

            let entries = tx
                .execute("DELETE FROM sync_log_entries WHERE timestamp < ?1", params![cutoff])
                .map_err(map_sql_error)?;
            let runs = tx
                .execute("DELETE FROM sync_runs WHERE started_at < ?1", params![cutoff])
                .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)?;

            Ok((entries + runs) as u64)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn encode_messages(messages: &[String]) -> DomainResult<String> {
    serde_json::to_string(messages)
        .map_err(|err| DaoSyncError::Internal(format!("failed to encode run messages: {err}")))
}

fn decode_messages(column: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err)))
}

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let level: String = row.get(1)?;
    let level = level
        .parse::<LogLevel>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, err.into()))?;

    let context = row
        .get::<_, Option<String>>(3)?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;

    Ok(LogEntry { timestamp: from_millis(0, row.get(0)?)?, level, message: row.get(2)?, context })
}

fn map_run_row(row: &Row<'_>) -> rusqlite::Result<SyncRunStats> {
    let errors: String = row.get(6)?;
    let warnings: String = row.get(7)?;

    Ok(SyncRunStats {
        started_at: from_millis(0, row.get(0)?)?,
        duration_ms: u64::try_from(row.get::<_, i64>(1)?).unwrap_or(0),
        accounts_processed: row.get(2)?,
        posts_updated: row.get(3)?,
        posts_added: row.get(4)?,
        api_requests: row.get(5)?,
        errors: decode_messages(6, &errors)?,
        warnings: decode_messages(7, &warnings)?,
    })
}
