#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use daosync_domain::TrackedAccount;
use daosync_infra::database::{DbManager, SqliteAccountRepository};
use daosync_infra::{HttpClient, HttpTimelineClient};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

pub const TEST_TOKEN: &str = "test-bearer-token";
pub const START_TS: i64 = 1_700_000_000;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new migrated database in a temp dir.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager =
            DbManager::new(temp_dir.path().join("daosync.db"), 4).expect("db manager created");
        manager.run_migrations().expect("migrations should run");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    /// Insert tracked accounts in listing order.
    pub async fn seed_accounts(&self, accounts: &[TrackedAccount]) {
        let repo = SqliteAccountRepository::new(Arc::clone(&self.manager));
        for account in accounts {
            repo.upsert_account(account).await.expect("account seeded");
        }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn account(id: &str, handle: &str) -> TrackedAccount {
    TrackedAccount {
        id: id.into(),
        name: format!("{handle} DAO"),
        handle: handle.into(),
        platform_user_id: format!("uid-{id}"),
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

/// Timeline client pointed at a mock server, with near-zero retry backoff.
pub fn timeline_client(server: &MockServer, max_attempts: usize) -> HttpTimelineClient {
    let http = HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .max_attempts(max_attempts)
        .base_backoff(Duration::from_millis(1))
        .build()
        .expect("http client");
    HttpTimelineClient::with_http_client(http, &server.uri(), TEST_TOKEN)
}

/// A post in the remote API's wire shape.
pub fn wire_post(id: &str, created_at: DateTime<Utc>, likes: u64) -> Value {
    json!({
        "id": id,
        "text": format!("post {id}"),
        "created_at": created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "public_metrics": {
            "like_count": likes,
            "retweet_count": 1,
            "reply_count": 2,
            "quote_count": 0,
            "impression_count": 1000
        }
    })
}
