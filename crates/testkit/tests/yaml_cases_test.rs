use atlas_testkit::yaml_runner::run_cases;

#[test]
fn add_and_drop_cases() {
    run_cases(
        r#"
cases:
  - name: add a table
    from: {}
    to:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
    want: [AddTable]
  - name: drop a table
    from:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
    to: {}
    want: [DropTable]
  - name: add a column
    from:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
    to:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
            - { name: email, type: text, null: true }
    want: [AddColumn]
"#,
    );
}

#[test]
fn modify_and_rename_cases() {
    run_cases(
        r#"
cases:
  - name: change a column type
    from:
      tables:
        users:
          columns:
            - { name: age, type: bigint }
    to:
      tables:
        users:
          columns:
            - { name: age, type: int }
    want: [ModifyColumn]
  - name: rename with a directive
    from:
      tables:
        users:
          columns:
            - { name: email, type: text }
    to:
      tables:
        users:
          columns:
            - { name: mail, type: text, renamed_from: email }
    want: [RenameColumn]
  - name: enum extension
    from:
      enums:
        state: ["on", "off"]
    to:
      enums:
        state: ["on", "off", "unknown"]
    want: [ModifyEnum]
"#,
    );
}

#[test]
fn index_and_foreign_key_cases() {
    run_cases(
        r#"
cases:
  - name: add an index
    from:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
    to:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
          indexes:
            - { name: idx_id, columns: [id] }
    want: [AddIndex]
  - name: foreign keys trail the new table
    from:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
    to:
      tables:
        users:
          columns:
            - { name: id, type: bigint }
        posts:
          columns:
            - { name: user_id, type: bigint }
          foreign_keys:
            - { symbol: posts_users_fk, columns: [user_id], ref_table: users, ref_columns: [id] }
    want: [AddTable, AddForeignKey]
"#,
    );
}
