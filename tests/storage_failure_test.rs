//! Behaviour while another connection holds the database write lock

mod common;

use std::time::Duration;

use rusqlite::Connection;

use coursetrack::EngineError;

use common::{TestEnv, flat_course};

fn row_counts(conn: &Connection) -> (i64, i64) {
    let progress = conn
        .query_row("SELECT COUNT(*) FROM learner_progress", [], |r| r.get(0))
        .unwrap();
    let units = conn
        .query_row("SELECT COUNT(*) FROM completed_units", [], |r| r.get(0))
        .unwrap();
    (progress, units)
}

#[test]
fn test_locked_store_fails_without_partial_state() {
    let env = TestEnv::new();
    env.write_course(&flat_course("c1", &["l1", "l2"]));
    let (engine, _) = env.engine_with_timeout(Duration::from_millis(100));

    let locker = Connection::open(env.db_path()).unwrap();
    locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

    let result = engine.submit_unit_completion("alice", "c1", "l1", true);
    assert!(
        matches!(result, Err(EngineError::StorageUnavailable(_))),
        "expected StorageUnavailable, got {:?}",
        result
    );
    assert!(result.unwrap_err().is_retryable());

    locker.execute_batch("ROLLBACK").unwrap();
    assert_eq!(row_counts(&locker), (0, 0));

    // The same call goes through once the lock is gone
    let retry = engine.submit_unit_completion("alice", "c1", "l1", true).unwrap();
    assert_eq!(retry.percentage, 50);
    assert_eq!(row_counts(&locker), (1, 1));
}

#[tokio::test]
async fn test_engine_call_reports_lock_timeout() {
    let env = TestEnv::new();
    env.write_course(&flat_course("c1", &["l1"]));
    let (engine, _) = env.engine_with_timeout(Duration::from_millis(100));

    let locker = Connection::open(env.db_path()).unwrap();
    locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

    let result = engine
        .call(Duration::from_secs(5), |e| {
            e.submit_unit_completion("alice", "c1", "l1", true)
        })
        .await;
    assert!(matches!(result, Err(EngineError::StorageUnavailable(_))));

    locker.execute_batch("ROLLBACK").unwrap();
    assert_eq!(row_counts(&locker), (0, 0));
}
