use std::time::Duration;

use atlas_core::{Change, Conn as _, Locker as _, PlanApplier as _, PlanOptions, Schema, Table};
use atlas_testkit::FakeDriver;

#[test]
fn executed_statements_are_recorded_in_order() {
    let mut driver = FakeDriver::new();
    driver.exec("CREATE TABLE a (id int)").unwrap();
    driver.exec("CREATE TABLE b (id int)").unwrap();
    assert_eq!(
        driver.executed,
        ["CREATE TABLE a (id int)", "CREATE TABLE b (id int)"]
    );
}

#[test]
fn fail_on_fragment_rejects_matching_statements() {
    let mut driver = FakeDriver::new();
    driver.fail_on = Some("b".to_string());
    driver.exec("CREATE TABLE a (id int)").unwrap();
    assert!(driver.exec("CREATE TABLE b (id int)").is_err());
    assert_eq!(driver.executed.len(), 1);
}

#[test]
fn rollback_discards_statements_since_begin() {
    let mut driver = FakeDriver::new();
    driver.exec("one").unwrap();
    driver.begin().unwrap();
    driver.exec("two").unwrap();
    driver.rollback().unwrap();
    assert_eq!(driver.executed, ["one"]);
}

#[test]
fn shared_locks_exclude_across_instances() {
    let mut first = FakeDriver::new();
    let mut second = first.sharing_locks();

    first.lock("migration", Duration::ZERO).unwrap();
    assert!(second.lock("migration", Duration::ZERO).is_err());
    assert!(second.lock("other", Duration::ZERO).is_ok());

    first.unlock("migration").unwrap();
    second.lock("migration", Duration::ZERO).unwrap();
}

#[test]
fn applied_changes_materialize_in_the_realm() {
    let mut driver = FakeDriver::new();
    let mut table = Table::new("users");
    table.schema = Some("app".to_string());
    driver
        .apply_changes(
            &[
                Change::AddSchema(Schema::new("app")),
                Change::AddTable(table),
            ],
            &PlanOptions::default(),
        )
        .unwrap();

    let schema = driver.realm.schema("app").unwrap();
    assert!(schema.table("users").is_some());
}
