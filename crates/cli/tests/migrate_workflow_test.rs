//! End-to-end runs of the compiled binary against a scratch directory and
//! a SQLite target file.

use std::path::Path;
use std::process::{Command, Output};

fn atlas(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_atlas"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("binary runs")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn seed_dir(root: &Path) -> String {
    let dir = root.join("migrations");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(
        dir.join("1_users.sql"),
        "CREATE TABLE users (id INTEGER NOT NULL PRIMARY KEY);\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("2_posts.sql"),
        "CREATE TABLE posts (id INTEGER NOT NULL PRIMARY KEY);\n",
    )
    .unwrap();
    format!("file://{}", dir.display())
}

#[test]
fn hash_validate_apply_status_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let dir_url = seed_dir(tmp.path());
    let db_url = format!("sqlite3://{}", tmp.path().join("app.db").display());

    let hash = atlas(&["migrate", "hash", "--dir", &dir_url], tmp.path());
    assert!(hash.status.success(), "{hash:?}");

    let validate = atlas(&["migrate", "validate", "--dir", &dir_url], tmp.path());
    assert!(validate.status.success(), "{validate:?}");

    let apply = atlas(
        &["migrate", "apply", "--dir", &dir_url, "--url", &db_url],
        tmp.path(),
    );
    assert!(apply.status.success(), "{apply:?}");
    assert!(stdout(&apply).contains("Applied version(s): 1, 2"));

    let status = atlas(
        &["migrate", "status", "--dir", &dir_url, "--url", &db_url],
        tmp.path(),
    );
    assert!(status.status.success(), "{status:?}");
    let printed = stdout(&status);
    assert!(printed.contains("applied"));
    assert!(printed.contains("0 pending file(s)."));

    // Idempotence: a second apply is a no-op.
    let again = atlas(
        &["migrate", "apply", "--dir", &dir_url, "--url", &db_url],
        tmp.path(),
    );
    assert!(again.status.success());
    assert!(stdout(&again).contains("No pending migration files."));
}

#[test]
fn tampering_with_a_file_yields_the_dirty_exit_code() {
    let tmp = tempfile::tempdir().unwrap();
    let dir_url = seed_dir(tmp.path());
    let db_url = format!("sqlite3://{}", tmp.path().join("app.db").display());

    let hash = atlas(&["migrate", "hash", "--dir", &dir_url], tmp.path());
    assert!(hash.status.success());

    std::fs::write(
        tmp.path().join("migrations").join("1_users.sql"),
        "CREATE TABLE users (id INTEGER NOT NULL PRIMARY KEY, name TEXT);\n",
    )
    .unwrap();

    let apply = atlas(
        &["migrate", "apply", "--dir", &dir_url, "--url", &db_url],
        tmp.path(),
    );
    assert_eq!(apply.status.code(), Some(3), "{apply:?}");
}

#[test]
fn lint_reports_destructive_files() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("migrations");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("1_drop.sql"), "DROP TABLE users;\n").unwrap();
    let dir_url = format!("file://{}", dir.display());

    atlas(&["migrate", "hash", "--dir", &dir_url], tmp.path());
    let lint = atlas(&["migrate", "lint", "--dir", &dir_url], tmp.path());
    assert!(lint.status.success(), "{lint:?}");
    assert!(stdout(&lint).contains("DS102"));
}

#[test]
fn new_creates_a_versioned_file_and_rehashes() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("migrations");
    let dir_url = format!("file://{}", dir.display());

    let new = atlas(&["migrate", "new", "--dir", &dir_url, "seed"], tmp.path());
    assert!(new.status.success(), "{new:?}");

    let entries: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(entries.iter().any(|n| n.ends_with("_seed.sql")));
    assert!(entries.iter().any(|n| n == "atlas.sum"));

    let validate = atlas(&["migrate", "validate", "--dir", &dir_url], tmp.path());
    assert!(validate.status.success(), "{validate:?}");
}

#[test]
fn unknown_driver_fails_with_a_user_error() {
    let tmp = tempfile::tempdir().unwrap();
    let out = atlas(
        &["schema", "inspect", "--url", "oracle://localhost/x"],
        tmp.path(),
    );
    assert_eq!(out.status.code(), Some(1), "{out:?}");
}

#[test]
fn schema_inspect_prints_the_model() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("app.db");
    let db_url = format!("sqlite3://{}", db_path.display());

    // Seed the database through the versioned workflow.
    let dir_url = seed_dir(tmp.path());
    atlas(&["migrate", "hash", "--dir", &dir_url], tmp.path());
    let apply = atlas(
        &["migrate", "apply", "--dir", &dir_url, "--url", &db_url],
        tmp.path(),
    );
    assert!(apply.status.success(), "{apply:?}");

    let inspect = atlas(&["schema", "inspect", "--url", &db_url], tmp.path());
    assert!(inspect.status.success(), "{inspect:?}");
    let printed = stdout(&inspect);
    assert!(printed.contains("\"users\""));
    assert!(printed.contains("\"posts\""));
}
