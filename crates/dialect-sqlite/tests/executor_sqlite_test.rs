//! Versioned migrations end to end against real database files: resume
//! after a failed statement, revision bookkeeping, and advisory-lock
//! exclusion between two agents.

use std::time::Duration;

use atlas_core::{Conn as _, Error, Locker as _, RevisionStore as _};
use atlas_core::migrate::{
    Executor, ExecutorOptions, LocalDir, RevisionTable, execution_lock_name, write_sum,
};
use atlas_dialect_sqlite::Sqlite;

fn seeded() -> (tempfile::TempDir, LocalDir, Sqlite) {
    let tmp = tempfile::tempdir().unwrap();
    let dir_path = tmp.path().join("migrations");
    std::fs::create_dir(&dir_path).unwrap();
    let dir = LocalDir::open(&dir_path).unwrap();
    dir.write_file("1_users.sql", b"CREATE TABLE users (id INTEGER NOT NULL PRIMARY KEY);\n")
        .unwrap();
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id INTEGER NOT NULL PRIMARY KEY);\nINSERT INTO missing_table VALUES (1);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();

    let db = Sqlite::open(tmp.path().join("app.db")).unwrap();
    (tmp, dir, db)
}

#[test]
fn failed_statement_is_recorded_and_retried_after_the_fix() {
    let (_tmp, dir, mut db) = seeded();

    let err = Executor::new(&mut db, &dir).execute_n(0).unwrap_err();
    let Error::Statement { file, index, .. } = &err else {
        panic!("expected a statement failure, got {err:?}");
    };
    assert_eq!(file, "2_posts.sql");
    assert_eq!(*index, 1);

    let revisions = db.read_revisions(&RevisionTable::default()).unwrap();
    assert_eq!(revisions.len(), 2);
    assert!(revisions[0].ok());
    let failed = &revisions[1];
    assert!(!failed.ok());
    assert!(failed.error.is_some());
    assert_eq!(failed.error_stmt.as_deref(), Some("INSERT INTO missing_table VALUES (1)"));
    // Transactional DDL rolled the file back, so nothing of it stuck.
    assert_eq!(failed.applied, 0);

    // Fix the second file and re-run: both files complete and the log
    // converges to all-ok.
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id INTEGER NOT NULL PRIMARY KEY);\nINSERT INTO posts VALUES (1);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();

    let report = Executor::new(&mut db, &dir).execute_n(0).unwrap();
    assert_eq!(report.applied, ["2"]);

    let revisions = db.read_revisions(&RevisionTable::default()).unwrap();
    assert!(revisions.iter().all(|r| r.ok()), "{revisions:#?}");
    db.exec("SELECT id FROM posts").unwrap();
}

#[test]
fn execute_is_idempotent_on_a_synced_target() {
    let (_tmp, dir, mut db) = seeded();
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id INTEGER NOT NULL PRIMARY KEY);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();

    Executor::new(&mut db, &dir).execute_n(0).unwrap();
    let first = db.read_revisions(&RevisionTable::default()).unwrap();

    let report = Executor::new(&mut db, &dir).execute_n(0).unwrap();
    assert!(report.applied.is_empty());
    let second = db.read_revisions(&RevisionTable::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn two_agents_contend_on_the_same_lock() {
    let (tmp, dir, mut db) = seeded();
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id INTEGER NOT NULL PRIMARY KEY);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();

    // A rival agent holds the execution lock for this directory.
    let mut rival = Sqlite::open(tmp.path().join("app.db")).unwrap();
    let lock = execution_lock_name(&dir);
    rival.lock(&lock, Duration::ZERO).unwrap();

    let options = ExecutorOptions {
        lock_timeout: Duration::from_millis(500),
        ..ExecutorOptions::default()
    };
    let started = std::time::Instant::now();
    let err = Executor::new(&mut db, &dir)
        .with_options(options.clone())
        .execute_n(0)
        .unwrap_err();
    assert!(err.is_locked(), "got {err:?}");
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "lock wait must respect the timeout"
    );

    rival.unlock(&lock).unwrap();
    Executor::new(&mut db, &dir)
        .with_options(options)
        .execute_n(0)
        .unwrap();
}

#[test]
fn revision_store_round_trips_records() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = Sqlite::open(tmp.path().join("app.db")).unwrap();
    let table = RevisionTable::default();
    db.ensure_revisions(&table).unwrap();

    let mut revision = atlas_core::migrate::Revision::new("20240101", "init");
    revision.applied = 2;
    revision.total = 2;
    revision.hash = "h1:abc".to_string();
    revision.partial_hashes = vec!["h1:s0".to_string(), "h1:s1".to_string()];
    revision.operator_version = "atlas-rs/0.1.0".to_string();
    db.write_revision(&table, &revision).unwrap();

    let read = db.read_revisions(&table).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].version, "20240101");
    assert_eq!(read[0].partial_hashes, revision.partial_hashes);
    assert!(read[0].ok());

    db.delete_revision(&table, "20240101").unwrap();
    assert!(db.read_revisions(&table).unwrap().is_empty());
}
