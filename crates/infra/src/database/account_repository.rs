//! SQLite-backed implementation of the tracked account port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use daosync_core::AccountRepository as AccountRepositoryPort;
use daosync_domain::{Result as DomainResult, TrackedAccount};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{map_join_error, map_sql_error, to_millis, DbManager};

/// SQLite-backed implementation of `AccountRepository`
pub struct SqliteAccountRepository {
    db: Arc<DbManager>,
}

impl SqliteAccountRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert an account or refresh its name, handle and platform id
    ///
    /// Listing order (insertion order) is preserved for existing accounts.
    pub async fn upsert_account(&self, account: &TrackedAccount) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let account = account.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO tracked_accounts (id, name, handle, platform_user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    handle = excluded.handle,
                    platform_user_id = excluded.platform_user_id",
                params![
                    account.id,
                    account.name,
                    account.handle,
                    account.platform_user_id,
                    to_millis(Utc::now()),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl AccountRepositoryPort for SqliteAccountRepository {
    async fn list_tracked_accounts(&self) -> DomainResult<Vec<TrackedAccount>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<TrackedAccount>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, handle, platform_user_id FROM tracked_accounts
                     ORDER BY created_at, rowid",
                )
                .map_err(map_sql_error)?;

            let accounts = stmt
                .query_map([], map_account_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(accounts)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<TrackedAccount> {
    Ok(TrackedAccount {
        id: row.get(0)?,
        name: row.get(1)?,
        handle: row.get(2)?,
        platform_user_id: row.get(3)?,
    })
}
