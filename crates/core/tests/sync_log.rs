//! Integration tests for the sync log.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use daosync_common::time::{Clock, MockClock};
use daosync_core::sync::SyncLog;
use daosync_domain::{LogLevel, SyncRunStats};
use support::fakes::InMemorySyncLog;
use support::START_TS;

fn sync_log() -> (SyncLog, Arc<InMemorySyncLog>, MockClock) {
    let clock = MockClock::from_timestamp(START_TS);
    let repository = Arc::new(InMemorySyncLog::default());
    let log = SyncLog::new(repository.clone(), Arc::new(clock.clone()));
    (log, repository, clock)
}

fn run_at(clock: &MockClock, added: u32, updated: u32, errors: usize) -> SyncRunStats {
    SyncRunStats {
        duration_ms: 1_000,
        posts_added: added,
        posts_updated: updated,
        api_requests: 2,
        errors: vec!["alpha_dao: boom".to_string(); errors],
        ..SyncRunStats::started(clock.now())
    }
}

#[tokio::test]
async fn recent_returns_newest_first() {
    let (log, _, clock) = sync_log();

    for i in 0..5 {
        log.info(format!("entry {i}")).await;
        clock.advance(Duration::from_secs(1));
    }

    let recent = log.recent(3).await.unwrap();
    let messages: Vec<_> = recent.iter().map(|entry| entry.message.as_str()).collect();
    assert_eq!(messages, ["entry 4", "entry 3", "entry 2"]);
    assert!(recent[0].timestamp > recent[1].timestamp);
}

#[tokio::test]
async fn append_stamps_entries_with_clock_and_keeps_context() {
    let (log, repository, clock) = sync_log();

    log.append(LogLevel::Warn, "rate limited", Some(serde_json::json!({ "account": "beta" })))
        .await;

    let entries = repository.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].timestamp, clock.now());
    assert_eq!(entries[0].level, LogLevel::Warn);
    assert_eq!(entries[0].context.as_ref().unwrap()["account"], "beta");
}

#[tokio::test]
async fn append_swallows_store_failures() {
    let (log, repository, _) = sync_log();
    repository.fail_appends();

    log.error("this goes to tracing only").await;

    assert!(repository.entries().is_empty());
}

#[tokio::test]
async fn aggregate_rolls_up_runs_inside_the_window() {
    let (log, _, clock) = sync_log();

    log.record_run_stats(&run_at(&clock, 50, 50, 3)).await.unwrap();
    clock.advance(Duration::from_secs(5 * 24 * 3600));
    log.record_run_stats(&run_at(&clock, 3, 2, 0)).await.unwrap();
    clock.advance(Duration::from_secs(24 * 3600));
    log.record_run_stats(&run_at(&clock, 1, 4, 1)).await.unwrap();

    let aggregate = log.aggregate(2).await.unwrap().unwrap();

    assert_eq!(aggregate.runs, 2);
    assert_eq!(aggregate.posts_processed, 10);
    assert_eq!(aggregate.api_requests, 4);
    assert_eq!(aggregate.errors, 1);
    assert!((aggregate.average_duration_ms - 1_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn aggregate_of_empty_window_is_none() {
    let (log, _, clock) = sync_log();
    log.record_run_stats(&run_at(&clock, 1, 1, 0)).await.unwrap();
    clock.advance(Duration::from_secs(10 * 24 * 3600));

    assert_eq!(log.aggregate(7).await.unwrap(), None);
}

#[tokio::test]
async fn prune_removes_rows_older_than_retention() {
    let (log, repository, clock) = sync_log();
    log.info("old").await;
    log.record_run_stats(&run_at(&clock, 1, 0, 0)).await.unwrap();

    clock.set(clock.now() + ChronoDuration::days(40));
    log.info("new").await;

    let removed = log.prune(30).await.unwrap();

    assert_eq!(removed, 2);
    let remaining: Vec<_> = repository.entries().into_iter().map(|entry| entry.message).collect();
    assert_eq!(remaining, ["new"]);
    assert!(repository.runs().is_empty());
}
