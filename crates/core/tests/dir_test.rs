use atlas_core::Error;
use atlas_core::migrate::{LocalDir, split_file_name};

#[test]
fn file_names_split_into_version_and_description() {
    assert_eq!(
        split_file_name("1_init.sql").unwrap(),
        ("1".to_string(), "init".to_string())
    );
    assert_eq!(
        split_file_name("20240101120000.sql").unwrap(),
        ("20240101120000".to_string(), String::new())
    );
    assert_eq!(
        split_file_name("2_add_users_table.sql").unwrap(),
        ("2".to_string(), "add_users_table".to_string())
    );
    assert!(split_file_name("notes.txt").is_err());
    assert!(split_file_name("_missing_version.sql").is_err());
}

#[test]
fn files_sort_by_version() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = LocalDir::open(tmp.path()).unwrap();
    dir.write_file("3_third.sql", b"SELECT 3;").unwrap();
    dir.write_file("1_first.sql", b"SELECT 1;").unwrap();
    dir.write_file("2_second.sql", b"SELECT 2;").unwrap();
    dir.write_file("README.md", b"not a migration").unwrap();

    let versions: Vec<_> = dir.files().unwrap().into_iter().map(|f| f.version).collect();
    assert_eq!(versions, ["1", "2", "3"]);
}

#[test]
fn version_limit_truncates_the_view() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = LocalDir::open(tmp.path()).unwrap();
    dir.write_file("1_first.sql", b"SELECT 1;").unwrap();
    dir.write_file("2_second.sql", b"SELECT 2;").unwrap();
    dir.write_file("3_third.sql", b"SELECT 3;").unwrap();

    let limited = dir.with_version_limit("2");
    let versions: Vec<_> = limited
        .files()
        .unwrap()
        .into_iter()
        .map(|f| f.version)
        .collect();
    assert_eq!(versions, ["1", "2"]);
}

#[test]
fn directory_lock_is_exclusive_until_released() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = LocalDir::open(tmp.path()).unwrap();

    let held = dir.lock().unwrap();
    let err = dir.lock().unwrap_err();
    assert!(matches!(err, Error::LockTimeout { .. }));

    drop(held);
    dir.lock().unwrap();
}

#[test]
fn opening_a_missing_directory_is_a_user_error() {
    assert!(LocalDir::open("/nonexistent/migrations").is_err());
}
