use std::time::Duration;

use atlas_core::{Error, Locker as _, RevisionStore as _, StateError};
use atlas_core::migrate::{
    Executor, ExecutorOptions, LocalDir, Revision, RevisionTable, execution_lock_name,
    hash_content, scan_stmts, validate_dir, write_sum,
};
use atlas_testkit::FakeDriver;

fn seeded_dir() -> (tempfile::TempDir, LocalDir) {
    let tmp = tempfile::tempdir().unwrap();
    let dir = LocalDir::open(tmp.path()).unwrap();
    dir.write_file("1_users.sql", b"CREATE TABLE users (id bigint);\n")
        .unwrap();
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id bigint);\nINSERT INTO posts VALUES (1);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();
    (tmp, dir)
}

#[test]
fn executes_pending_files_in_version_order() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();

    let report = Executor::new(&mut driver, &dir).execute_n(0).unwrap();
    assert_eq!(report.applied, ["1", "2"]);
    assert_eq!(
        driver.executed,
        [
            "CREATE TABLE users (id bigint)",
            "CREATE TABLE posts (id bigint)",
            "INSERT INTO posts VALUES (1)",
        ]
    );
    let revisions = driver.revisions();
    assert_eq!(revisions.len(), 2);
    assert!(revisions.iter().all(Revision::ok));
    assert_eq!(revisions[1].applied, 2);
    assert_eq!(revisions[1].total, 2);
}

#[test]
fn rerunning_is_a_no_op() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();

    Executor::new(&mut driver, &dir).execute_n(0).unwrap();
    let executed = driver.executed.len();
    let revisions = driver.revisions().to_vec();

    let report = Executor::new(&mut driver, &dir).execute_n(0).unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(driver.executed.len(), executed);
    assert_eq!(driver.revisions(), revisions.as_slice());
}

#[test]
fn n_limits_the_number_of_applied_files() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();

    let report = Executor::new(&mut driver, &dir).execute_n(1).unwrap();
    assert_eq!(report.applied, ["1"]);
    assert_eq!(driver.revisions().len(), 1);
}

#[test]
fn failure_records_the_statement_index_and_resume_skips_the_prefix() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();
    driver.fail_on = Some("INSERT INTO posts".to_string());

    let err = Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();
    let Error::Statement { file, index, .. } = &err else {
        panic!("expected statement failure, got {err:?}");
    };
    assert_eq!(file, "2_posts.sql");
    assert_eq!(*index, 1);

    let failed = &driver.revisions()[1];
    assert!(!failed.ok());
    assert_eq!(failed.applied, 1);
    assert_eq!(failed.total, 2);
    assert_eq!(failed.error_stmt.as_deref(), Some("INSERT INTO posts VALUES (1)"));

    // Fix the failing statement and re-run: the already-applied first
    // statement of the file must not run again.
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id bigint);\nINSERT INTO posts VALUES (2);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();
    driver.fail_on = None;

    let report = Executor::new(&mut driver, &dir).execute_n(0).unwrap();
    assert_eq!(report.applied, ["2"]);

    let creates = driver
        .executed
        .iter()
        .filter(|s| s.contains("CREATE TABLE posts"))
        .count();
    assert_eq!(creates, 1, "resumed run must skip applied statements");

    let recovered = &driver.revisions()[1];
    assert!(recovered.ok());
    assert_eq!(recovered.applied, 2);
}

#[test]
fn resume_refuses_a_changed_applied_prefix() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();
    driver.fail_on = Some("INSERT INTO posts".to_string());
    Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();

    // Rewriting the statement that already ran invalidates the resume.
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id bigint, title text);\nINSERT INTO posts VALUES (1);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();
    driver.fail_on = None;

    let err = Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();
    assert!(matches!(
        err,
        Error::State(StateError::RevisionHash { version, .. }) if version == "2"
    ));
}

#[test]
fn checksum_mismatch_aborts_before_any_write() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();
    dir.write_file("1_users.sql", b"CREATE TABLE users (id int);\n")
        .unwrap();

    let err = Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();
    assert!(matches!(
        err,
        Error::State(StateError::ChecksumMismatch { .. })
    ));
    assert!(driver.executed.is_empty());
    assert!(driver.revisions().is_empty());
}

#[test]
fn history_rewrite_is_detected() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();

    // Record version 2 as applied while version 1 never was.
    let hashes = validate_dir(&dir).unwrap();
    let content = dir.read_file_utf8("2_posts.sql").unwrap();
    let stmts = scan_stmts(&content).unwrap();
    let mut revision = Revision::new("2", "posts");
    revision.applied = stmts.len();
    revision.total = stmts.len();
    revision.hash = hashes.file_hash("2_posts.sql").unwrap().to_string();
    revision.partial_hashes = stmts
        .iter()
        .map(|s| hash_content(s.text.as_bytes()))
        .collect();
    driver
        .write_revision(&RevisionTable::default(), &revision)
        .unwrap();

    let err = Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();
    assert!(matches!(
        err,
        Error::State(StateError::HistoryRewrite { file, .. }) if file == "1_users.sql"
    ));
}

#[test]
fn recorded_revision_missing_from_directory_is_an_error() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();
    let revision = Revision::new("9", "gone");
    driver
        .write_revision(&RevisionTable::default(), &revision)
        .unwrap();

    let err = Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();
    assert!(matches!(
        err,
        Error::State(StateError::UnknownRevision { version }) if version == "9"
    ));
}

#[test]
fn held_lock_times_out_and_released_lock_unblocks() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();
    let mut rival = driver.sharing_locks();

    let lock = execution_lock_name(&dir);
    rival.lock(&lock, Duration::ZERO).unwrap();

    let err = Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();
    assert!(err.is_locked());
    assert!(driver.executed.is_empty());

    rival.unlock(&lock).unwrap();
    Executor::new(&mut driver, &dir).execute_n(0).unwrap();
}

#[test]
fn lock_is_released_after_a_failed_run() {
    let (_tmp, dir) = seeded_dir();
    let mut driver = FakeDriver::new();
    driver.fail_on = Some("INSERT INTO posts".to_string());
    Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();

    // A second run acquires the lock again, proving release on error;
    // it fails on the same statement, not on the lock.
    let err = Executor::new(&mut driver, &dir).execute_n(0).unwrap_err();
    assert!(!err.is_locked());
    assert!(matches!(err, Error::Statement { .. }));
}

#[test]
fn fresh_target_starts_at_the_latest_checkpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = LocalDir::open(tmp.path()).unwrap();
    dir.write_file("1_users.sql", b"CREATE TABLE users (id bigint);\n")
        .unwrap();
    dir.write_file(
        "2_checkpoint.sql",
        b"-- atlas:checkpoint\nCREATE TABLE users (id bigint, name text);\n",
    )
    .unwrap();
    dir.write_file("3_posts.sql", b"CREATE TABLE posts (id bigint);\n")
        .unwrap();
    write_sum(&dir).unwrap();

    let mut driver = FakeDriver::new();
    let report = Executor::new(&mut driver, &dir).execute_n(0).unwrap();
    assert_eq!(report.applied, ["2", "3"]);
    assert!(
        driver
            .executed
            .iter()
            .all(|s| s != "CREATE TABLE users (id bigint)"),
        "file 1 must be skipped"
    );
}

#[test]
fn unknown_checkpoint_tag_is_a_user_error() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = LocalDir::open(tmp.path()).unwrap();
    dir.write_file(
        "1_checkpoint.sql",
        b"-- atlas:checkpoint v1\nCREATE TABLE users (id bigint);\n",
    )
    .unwrap();
    write_sum(&dir).unwrap();

    let mut driver = FakeDriver::new();
    let options = ExecutorOptions {
        checkpoint_tag: Some("v9".to_string()),
        ..ExecutorOptions::default()
    };
    let err = Executor::new(&mut driver, &dir)
        .with_options(options)
        .execute_n(0)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::User(atlas_core::UserError::CheckpointTag { tag }) if tag == "v9"
    ));
}
