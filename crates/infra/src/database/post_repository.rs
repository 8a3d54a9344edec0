//! SQLite-backed implementation of the post repository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daosync_core::PostRepository as PostRepositoryPort;
use daosync_domain::{DaoSyncError, EngagementMetrics, Post, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::{
    from_millis, from_sql_count, map_join_error, map_sql_error, to_millis, to_sql_count,
    DbManager,
};

/// SQLite-backed implementation of `PostRepository`
pub struct SqlitePostRepository {
    db: Arc<DbManager>,
}

impl SqlitePostRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepositoryPort for SqlitePostRepository {
    async fn find_post(&self, id: &str) -> DomainResult<Option<Post>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Post>> {
            let conn = db.get_connection()?;
            conn.query_row(&format!("{POST_SELECT_SQL} WHERE id = ?1"), params![id], map_post_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_post(&self, post: &Post) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let post = post.clone();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO posts (
                        id, account_id, created_at, text, likes, reposts, replies, quotes,
                        last_synced_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        post.id,
                        post.account_id,
                        to_millis(post.created_at),
                        post.text,
                        to_sql_count(post.metrics.likes),
                        to_sql_count(post.metrics.reposts),
                        to_sql_count(post.metrics.replies),
                        to_sql_count(post.metrics.quotes),
                        to_millis(post.last_synced_at),
                    ],
                )
                .map_err(map_sql_error)?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_post_metrics(
        &self,
        id: &str,
        metrics: &EngagementMetrics,
        synced_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let metrics = *metrics;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE posts
                     SET likes = ?2, reposts = ?3, replies = ?4, quotes = ?5, last_synced_at = ?6
                     WHERE id = ?1",
                    params![
                        id,
                        to_sql_count(metrics.likes),
                        to_sql_count(metrics.reposts),
                        to_sql_count(metrics.replies),
                        to_sql_count(metrics.quotes),
                        to_millis(synced_at),
                    ],
                )
                .map_err(map_sql_error)?;

            if updated == 0 {
                return Err(DaoSyncError::NotFound(format!("post {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

const POST_SELECT_SQL: &str = "SELECT id, account_id, created_at, text, likes, reposts, replies,
        quotes, last_synced_at FROM posts";

fn map_post_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        account_id: row.get(1)?,
        created_at: from_millis(2, row.get(2)?)?,
        text: row.get(3)?,
        metrics: EngagementMetrics {
            likes: from_sql_count(row.get(4)?),
            reposts: from_sql_count(row.get(5)?),
            replies: from_sql_count(row.get(6)?),
            quotes: from_sql_count(row.get(7)?),
        },
        last_synced_at: from_millis(8, row.get(8)?)?,
    })
}
