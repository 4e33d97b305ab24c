use atlas_core::{Error, Plan, PlanChange, PlanKind};

#[test]
fn reverse_mirrors_forward_order() {
    let mut plan = Plan::new("test", true);
    plan.push(
        PlanChange::new(PlanKind::Create, "CREATE TABLE a (x int)", "create \"a\" table")
            .with_reverse("DROP TABLE a"),
    );
    plan.push(
        PlanChange::new(PlanKind::Create, "CREATE INDEX i ON a (x)", "create index \"i\"")
            .with_reverse("DROP INDEX i"),
    );

    assert!(plan.reversible);
    let reverse = plan.reverse().unwrap();
    assert_eq!(reverse, ["DROP INDEX i", "DROP TABLE a"]);
}

#[test]
fn missing_reverse_marks_plan_irreversible() {
    let mut plan = Plan::new("enum extension", true);
    plan.push(PlanChange::new(
        PlanKind::Alter,
        "ALTER TYPE state ADD VALUE 'unknown'",
        "add value to enum type \"state\"",
    ));

    assert!(!plan.reversible);
    let err = plan.reverse().unwrap_err();
    assert!(matches!(err, Error::Irreversible { name, .. } if name == "enum extension"));
}

#[test]
fn reversibility_downgrades_but_never_recovers() {
    let mut plan = Plan::new("mixed", false);
    plan.push(
        PlanChange::new(PlanKind::Create, "CREATE TABLE a (x int)", "create")
            .with_reverse("DROP TABLE a"),
    );
    assert!(plan.reversible);
    plan.push(PlanChange::new(PlanKind::Drop, "DROP TABLE b", "drop"));
    assert!(!plan.reversible);
    plan.push(
        PlanChange::new(PlanKind::Create, "CREATE TABLE c (x int)", "create")
            .with_reverse("DROP TABLE c"),
    );
    assert!(!plan.reversible);
}
