use anyhow::Result;
use chrono::Utc;

use atlas_core::{
    DiffEngine, InspectOptions, Inspector as _, PlanApplier as _, PlanOptions,
    RevisionStore as _, parse_dir_url,
    migrate::{
        Executor, ExecutorOptions, LocalDir, Revision, RevisionKind, RevisionTable,
        builtin_analyzers, hash_content, run_analyzers, scan_stmts, validate_dir, write_sum,
    },
};

use crate::{DirFlags, MigrateCommand, registry};

pub fn run(command: MigrateCommand) -> Result<()> {
    match command {
        MigrateCommand::Diff {
            dir,
            to,
            dev_url,
            name,
        } => diff(&dir, &to, &dev_url, name.as_deref()),
        MigrateCommand::Hash(dir) => hash(&dir),
        MigrateCommand::Validate(dir) => {
            validate_dir(&open_dir(&dir)?)?;
            println!("Directory is in sync with its checksum file.");
            Ok(())
        }
        MigrateCommand::Apply {
            dir,
            url,
            n,
            revisions_schema,
            lock_timeout_ms,
            dry_run,
        } => apply(&dir, &url, n, revisions_schema, lock_timeout_ms, dry_run),
        MigrateCommand::Status {
            dir,
            url,
            revisions_schema,
        } => status(&dir, &url, revisions_schema),
        MigrateCommand::Set {
            dir,
            url,
            version,
            revisions_schema,
        } => set(&dir, &url, &version, revisions_schema),
        MigrateCommand::New { dir, name } => new_file(&dir, name.as_deref()),
        MigrateCommand::Lint(dir) => lint(&dir),
    }
}

fn open_dir(flags: &DirFlags) -> Result<LocalDir> {
    let parsed = parse_dir_url(&flags.dir)?;
    let mut dir = LocalDir::open(parsed.path)?;
    if let Some(limit) = parsed.version_limit {
        dir = dir.with_version_limit(limit);
    }
    Ok(dir)
}

fn revision_table(schema: Option<String>) -> RevisionTable {
    match schema {
        Some(schema) => RevisionTable::in_schema(schema),
        None => RevisionTable::default(),
    }
}

fn diff(flags: &DirFlags, to: &str, dev_url: &str, name: Option<&str>) -> Result<()> {
    let parsed = parse_dir_url(&flags.dir)?;
    let dir = LocalDir::create(parsed.path)?;
    if dir.files()?.is_empty() {
        write_sum(&dir)?;
    }
    let _lock = dir.lock()?;

    // Replay the directory against the twin so the diff starts from the
    // state the migration history produces, not from the live target.
    let (_, mut dev) = registry::open(dev_url)?;
    let mut executor = Executor::new(dev.as_mut(), &dir);
    executor.execute_n(0)?;

    let current = dev.inspect_realm(&InspectOptions::default())?;
    let (_, mut desired_driver) = registry::open(to)?;
    let desired = desired_driver.inspect_realm(&InspectOptions::default())?;

    let engine = DiffEngine::new(dev.diff_hooks());
    let changes = engine.realm_diff(&current, &desired)?;
    if changes.is_empty() {
        println!("The migration directory is synced with the desired state.");
        return Ok(());
    }
    let plan = dev.plan_changes("migrate diff", &changes, &PlanOptions::default())?;

    let version = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let file_name = match name {
        Some(name) => format!("{version}_{name}.sql"),
        None => format!("{version}.sql"),
    };
    let mut content = String::new();
    for change in &plan.changes {
        content.push_str(&format!("-- {}\n{};\n", change.comment, change.cmd));
    }
    dir.write_file(&file_name, content.as_bytes())?;
    write_sum(&dir)?;
    println!("Wrote {file_name} with {} statement(s).", plan.changes.len());
    Ok(())
}

fn hash(flags: &DirFlags) -> Result<()> {
    let dir = open_dir(flags)?;
    let _lock = dir.lock()?;
    let hashes = write_sum(&dir)?;
    println!("Hashed {} file(s).", hashes.entries().len());
    Ok(())
}

fn apply(
    flags: &DirFlags,
    url: &str,
    n: Option<usize>,
    revisions_schema: Option<String>,
    lock_timeout_ms: u64,
    dry_run: bool,
) -> Result<()> {
    let dir = open_dir(flags)?;
    let (_, mut driver) = registry::open(url)?;

    if dry_run {
        validate_dir(&dir)?;
        let table = revision_table(revisions_schema);
        driver.ensure_revisions(&table)?;
        let revisions = driver.read_revisions(&table)?;
        for file in dir.files()? {
            let state = revisions
                .iter()
                .find(|r| r.version == file.version)
                .map(|r| if r.ok() { "applied" } else { "error" })
                .unwrap_or("pending");
            println!("{} {}", file.name, state);
        }
        return Ok(());
    }

    let options = ExecutorOptions {
        revision_table: revision_table(revisions_schema),
        lock_timeout: std::time::Duration::from_millis(lock_timeout_ms),
        ..ExecutorOptions::default()
    };
    let report = Executor::new(driver.as_mut(), &dir)
        .with_options(options)
        .with_analyzers(builtin_analyzers())
        .with_recognizers(recognizers())
        .execute_n(n.map_or(0, |n| n as isize))?;

    for file_report in &report.reports {
        for diagnostic in &file_report.diagnostics {
            eprintln!(
                "warning: {}: [{}] {}",
                file_report.file, diagnostic.code, diagnostic.text
            );
        }
    }
    if report.applied.is_empty() {
        println!("No pending migration files.");
    } else {
        println!("Applied version(s): {}", report.applied.join(", "));
    }
    Ok(())
}

fn status(flags: &DirFlags, url: &str, revisions_schema: Option<String>) -> Result<()> {
    let dir = open_dir(flags)?;
    validate_dir(&dir)?;
    let (_, mut driver) = registry::open(url)?;
    let table = revision_table(revisions_schema);
    driver.ensure_revisions(&table)?;
    let revisions = driver.read_revisions(&table)?;

    let mut pending = 0usize;
    for file in dir.files()? {
        match revisions.iter().find(|r| r.version == file.version) {
            Some(rev) if rev.ok() => println!("{:<40} applied", file.name),
            Some(rev) => println!(
                "{:<40} error at statement {} of {}",
                file.name, rev.applied, rev.total
            ),
            None => {
                pending += 1;
                println!("{:<40} pending", file.name);
            }
        }
    }
    println!("{pending} pending file(s).");
    Ok(())
}

/// Record one revision by hand, marking the file as applied without
/// executing it.
fn set(flags: &DirFlags, url: &str, version: &str, revisions_schema: Option<String>) -> Result<()> {
    let dir = open_dir(flags)?;
    let hashes = validate_dir(&dir)?;
    let file = dir
        .files()?
        .into_iter()
        .find(|f| f.version == version)
        .ok_or_else(|| atlas_core::Error::not_exist("migration file", version))?;

    let content = dir.read_file_utf8(&file.name)?;
    let stmts = scan_stmts(&content)?;
    let mut revision = Revision::new(&file.version, &file.description);
    revision.kind = RevisionKind::Manual;
    revision.applied = stmts.len();
    revision.total = stmts.len();
    revision.partial_hashes = stmts
        .iter()
        .map(|s| hash_content(s.text.as_bytes()))
        .collect();
    revision.hash = hashes.file_hash(&file.name).unwrap_or_default().to_string();
    revision.operator_version = format!("atlas-cli/{}", env!("CARGO_PKG_VERSION"));

    let (_, mut driver) = registry::open(url)?;
    let table = revision_table(revisions_schema);
    driver.ensure_revisions(&table)?;
    driver.write_revision(&table, &revision)?;
    println!("Recorded version {version} as applied.");
    Ok(())
}

fn new_file(flags: &DirFlags, name: Option<&str>) -> Result<()> {
    let parsed = parse_dir_url(&flags.dir)?;
    let dir = LocalDir::create(parsed.path)?;
    let _lock = dir.lock()?;

    let version = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let file_name = match name {
        Some(name) => format!("{version}_{name}.sql"),
        None => format!("{version}.sql"),
    };
    dir.write_file(&file_name, b"")?;
    write_sum(&dir)?;
    println!("Created {file_name}.");
    Ok(())
}

fn lint(flags: &DirFlags) -> Result<()> {
    let dir = open_dir(flags)?;
    validate_dir(&dir)?;
    let analyzers = builtin_analyzers();
    let recognizers = recognizers();

    let mut findings = 0usize;
    for file in dir.files()? {
        let content = dir.read_file_utf8(&file.name)?;
        let stmts = scan_stmts(&content)?;
        let report = run_analyzers(&file.name, &stmts, &analyzers, &recognizers);
        for diagnostic in &report.diagnostics {
            findings += 1;
            println!(
                "{}: [{}] {}",
                report.file, diagnostic.code, diagnostic.text
            );
        }
    }
    if findings == 0 {
        println!("No diagnostics.");
    }
    Ok(())
}

fn recognizers() -> Vec<Box<dyn atlas_core::migrate::Recognizer>> {
    vec![
        #[cfg(feature = "sqlite")]
        Box::new(atlas_dialect_sqlite::RebuildRecognizer),
    ]
}
