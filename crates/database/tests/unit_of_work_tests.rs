// crates/database/tests/unit_of_work_tests.rs
//! Integration tests for the unit-of-work executor

use rampart_core::ManualClock;
use rampart_database::{
    execute_with_retry, DbError, DbResult, Session, SessionSource, SqliteSessionSource, UnitOfWork,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Session source whose sessions only count opens and closes
#[derive(Default)]
struct CountingSource {
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

struct CountingSession {
    closed: Arc<AtomicUsize>,
}

impl Session for CountingSession {
    fn close(self) -> DbResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl SessionSource for CountingSource {
    type Session = CountingSession;

    fn acquire(&self) -> DbResult<CountingSession> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(CountingSession {
            closed: Arc::clone(&self.closed),
        })
    }
}

#[test]
fn test_connection_reset_twice_then_success() {
    let clock = ManualClock::new();
    let uow = UnitOfWork::new(CountingSource::default()).with_clock(Arc::new(clock.clone()));
    let mut attempts = 0;

    let result = uow.execute(
        |_| {
            attempts += 1;
            if attempts <= 2 {
                Err(DbError::operational("connection reset by peer"))
            } else {
                Ok("inserted")
            }
        },
        3,
        Duration::from_secs(1),
    );

    assert_eq!(result.expect("earlier errors are not surfaced"), "inserted");
    assert_eq!(attempts, 3);
    assert_eq!(uow.source().opened.load(Ordering::SeqCst), 3);
    assert_eq!(uow.source().closed.load(Ordering::SeqCst), 3);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[test]
fn test_free_function_borrows_source() {
    let source = CountingSource::default();
    let value = execute_with_retry(&source, |_| Ok(5), 0, Duration::ZERO).expect("work");

    assert_eq!(value, 5);
    assert_eq!(source.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sqlite_unit_of_work() {
    let uow = UnitOfWork::new(SqliteSessionSource::in_memory().expect("connect"));

    uow.run(|session| {
        session.execute("CREATE TABLE suppliers (name TEXT PRIMARY KEY, region TEXT NOT NULL)")
    })
    .expect("create table");

    let inserted = uow
        .run(|session| session.execute("INSERT INTO suppliers VALUES ('Acme', 'east'), ('Leaf', 'west')"))
        .expect("insert");
    assert_eq!(inserted, 2);

    let count = uow
        .run(|session| session.fetch_i64("SELECT COUNT(*) FROM suppliers"))
        .expect("count");
    assert_eq!(count, 2);
}

#[test]
fn test_sqlite_constraint_violation_not_retried() {
    let clock = ManualClock::new();
    let uow = UnitOfWork::new(SqliteSessionSource::in_memory().expect("connect"))
        .with_clock(Arc::new(clock.clone()));
    uow.run(|session| session.execute("CREATE TABLE suppliers (name TEXT PRIMARY KEY)"))
        .expect("create table");

    let mut attempts = 0;
    let result = uow.execute(
        |session| {
            attempts += 1;
            session.execute("INSERT INTO suppliers VALUES ('Acme'), ('Acme')")
        },
        3,
        Duration::from_secs(1),
    );

    assert!(matches!(result, Err(DbError::Database { .. })));
    assert_eq!(attempts, 1);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn test_sqlite_session_run_with_bound_parameters() {
    let uow = UnitOfWork::new(SqliteSessionSource::in_memory().expect("connect"));
    uow.run(|session| session.execute("CREATE TABLE trends (category TEXT, growth REAL)"))
        .expect("create table");

    let category = "tea".to_string();
    uow.run(|session| {
        let category = category.clone();
        session.run(move |conn| {
            Box::pin(async move {
                sqlx::query("INSERT INTO trends VALUES (?, ?)")
                    .bind(category)
                    .bind(12.5_f64)
                    .execute(conn)
                    .await
                    .map(|done| done.rows_affected())
            })
        })
    })
    .expect("insert");

    let growth: f64 = uow
        .run(|session| {
            session.run(|conn| {
                Box::pin(async move {
                    sqlx::query_scalar("SELECT growth FROM trends WHERE category = 'tea'")
                        .fetch_one(conn)
                        .await
                })
            })
        })
        .expect("select");
    assert_eq!(growth, 12.5);
}
