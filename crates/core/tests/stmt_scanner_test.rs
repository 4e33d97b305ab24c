use atlas_core::migrate::{checkpoint_of, scan_stmts};

#[test]
fn splits_on_top_level_semicolons() {
    let stmts = scan_stmts("CREATE TABLE t (id int);\nINSERT INTO t VALUES (1);\n").unwrap();
    assert_eq!(stmts.len(), 2);
    assert_eq!(stmts[0].text, "CREATE TABLE t (id int)");
    assert_eq!(stmts[1].text, "INSERT INTO t VALUES (1)");
}

#[test]
fn semicolons_inside_strings_do_not_terminate() {
    let stmts = scan_stmts("INSERT INTO t VALUES ('a;b', \"c;d\", `e;f`);").unwrap();
    assert_eq!(stmts.len(), 1);
    assert!(stmts[0].text.contains("'a;b'"));
}

#[test]
fn line_comments_inside_statements_are_preserved() {
    let stmts = scan_stmts("CREATE TABLE t (\n  id int -- key; really\n);").unwrap();
    assert_eq!(stmts.len(), 1);
    assert!(stmts[0].text.contains("-- key; really"));
}

#[test]
fn dollar_quoted_bodies_hold_semicolons() {
    let sql = "CREATE FUNCTION f() RETURNS void AS $fn$ BEGIN SELECT 1; END $fn$ LANGUAGE plpgsql;";
    let stmts = scan_stmts(sql).unwrap();
    assert_eq!(stmts.len(), 1);
    assert!(stmts[0].text.contains("SELECT 1;"));
}

#[test]
fn delimiter_directive_overrides_terminator() {
    let sql = "\
-- atlas:delimiter //
CREATE TRIGGER tg BEFORE INSERT ON t BEGIN UPDATE t SET x = 1; END//
-- atlas:delimiter ;
SELECT 1;
";
    let stmts = scan_stmts(sql).unwrap();
    assert_eq!(stmts.len(), 2);
    assert!(stmts[0].text.contains("UPDATE t SET x = 1;"));
    assert_eq!(stmts[1].text, "SELECT 1");
}

#[test]
fn statement_positions_point_into_the_file() {
    let content = "CREATE TABLE a (id int);\nCREATE TABLE b (id int);";
    let stmts = scan_stmts(content).unwrap();
    assert_eq!(stmts[0].pos, 0);
    assert_eq!(&content[stmts[1].pos..stmts[1].pos + 14], "CREATE TABLE b");
}

#[test]
fn leading_comments_attach_to_the_next_statement() {
    let stmts = scan_stmts("-- creates the users table\nCREATE TABLE users (id int);").unwrap();
    assert_eq!(stmts.len(), 1);
    assert_eq!(stmts[0].comments, ["-- creates the users table"]);
}

#[test]
fn nolint_directive_lists_codes() {
    let stmts = scan_stmts("-- atlas:nolint:DS102\nDROP TABLE users;").unwrap();
    assert_eq!(stmts[0].nolint(), Some(vec!["DS102".to_string()]));

    let stmts = scan_stmts("-- atlas:nolint\nDROP TABLE users;").unwrap();
    assert_eq!(stmts[0].nolint(), Some(vec![]));

    let stmts = scan_stmts("DROP TABLE users;").unwrap();
    assert_eq!(stmts[0].nolint(), None);
}

#[test]
fn checkpoint_directive_is_detected() {
    let tagged = checkpoint_of("-- atlas:checkpoint v2\nCREATE TABLE t (id int);").unwrap();
    assert_eq!(tagged.tag.as_deref(), Some("v2"));

    let untagged = checkpoint_of("-- atlas:checkpoint\nCREATE TABLE t (id int);").unwrap();
    assert_eq!(untagged.tag, None);

    assert!(checkpoint_of("CREATE TABLE t (id int);").is_none());
}

#[test]
fn missing_trailing_terminator_still_yields_statement() {
    let stmts = scan_stmts("CREATE TABLE t (id int)").unwrap();
    assert_eq!(stmts.len(), 1);
}
