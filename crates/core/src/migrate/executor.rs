use std::time::{Duration, Instant};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{Conn as _, Driver, Error, Locker as _, Result, RevisionStore as _, StateError};

use super::{
    Analyzer, LocalDir, MigrationFile, Recognizer, Report, Revision, RevisionTable, Severity,
    SeverityPolicy, checkpoint_of, hash::{HashFile, hash_content, validate_dir}, run_analyzers,
    scan_stmts,
};

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub revision_table: RevisionTable,
    pub lock_timeout: Duration,
    pub operator_version: String,
    pub severity: SeverityPolicy,
    /// Skip to this checkpoint on a fresh target instead of the latest one.
    pub checkpoint_tag: Option<String>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            revision_table: RevisionTable::default(),
            lock_timeout: Duration::from_secs(10),
            operator_version: format!("atlas-rs/{}", env!("CARGO_PKG_VERSION")),
            severity: SeverityPolicy::default(),
            checkpoint_tag: None,
        }
    }
}

/// What an execution did: the versions it applied and the analyzer
/// reports it produced along the way.
#[derive(Debug, Default)]
pub struct ExecuteReport {
    pub applied: Vec<String>,
    pub reports: Vec<Report>,
}

/// Advances a target database through pending migration files. Runs are
/// serialized per (target, directory) by the driver's advisory lock;
/// everything else is validated before the first write.
pub struct Executor<'a> {
    driver: &'a mut dyn Driver,
    dir: &'a LocalDir,
    options: ExecutorOptions,
    analyzers: Vec<Box<dyn Analyzer>>,
    recognizers: Vec<Box<dyn Recognizer>>,
}

impl<'a> Executor<'a> {
    pub fn new(driver: &'a mut dyn Driver, dir: &'a LocalDir) -> Self {
        Self {
            driver,
            dir,
            options: ExecutorOptions::default(),
            analyzers: Vec::new(),
            recognizers: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_analyzers(mut self, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        self.analyzers = analyzers;
        self
    }

    pub fn with_recognizers(mut self, recognizers: Vec<Box<dyn Recognizer>>) -> Self {
        self.recognizers = recognizers;
        self
    }

    /// Apply up to `n` pending files; all of them when `n <= 0`.
    /// Re-running after success is a no-op; after a failure, the run
    /// resumes at the statement index recorded with the failed revision.
    pub fn execute_n(&mut self, n: isize) -> Result<ExecuteReport> {
        let lock_name = execution_lock_name(self.dir);
        self.driver.lock(&lock_name, self.options.lock_timeout)?;
        let result = self.execute_locked(n);
        let unlocked = self.driver.unlock(&lock_name);
        match (result, unlocked) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), unlock) => {
                if let Err(unlock_err) = unlock {
                    warn!(error = %unlock_err, "releasing advisory lock failed");
                }
                Err(e)
            }
        }
    }

    fn execute_locked(&mut self, n: isize) -> Result<ExecuteReport> {
        let hashes = validate_dir(self.dir)?;
        let files = self.dir.files()?;
        validate_versions(&files)?;

        let table = self.options.revision_table.clone();
        self.driver.ensure_revisions(&table)?;
        let revisions = self.driver.read_revisions(&table)?;
        check_history(&files, &revisions, &hashes)?;

        let pending = self.pending(&files, &revisions)?;
        let limit = if n <= 0 { pending.len() } else { n as usize };

        let mut report = ExecuteReport::default();
        for (file, resume_from, existing) in pending.into_iter().take(limit) {
            self.execute_file(&file, resume_from, existing, &hashes, &mut report)?;
            report.applied.push(file.version.clone());
        }
        info!(applied = report.applied.len(), "migration execution finished");
        Ok(report)
    }

    /// Pending files in version order: every file not recorded `ok`, with
    /// the resume position of a previously failed attempt. A fresh target
    /// starts at the newest checkpoint instead of the beginning.
    fn pending(
        &mut self,
        files: &[MigrationFile],
        revisions: &[Revision],
    ) -> Result<Vec<(MigrationFile, usize, Option<Revision>)>> {
        let mut start = 0usize;
        if revisions.is_empty() {
            let mut checkpoint = None;
            for (i, file) in files.iter().enumerate() {
                let content = self.dir.read_file_utf8(&file.name)?;
                if let Some(found) = checkpoint_of(&content) {
                    match &self.options.checkpoint_tag {
                        Some(tag) => {
                            if found.tag.as_deref() == Some(tag.as_str()) {
                                checkpoint = Some(i);
                            }
                        }
                        None => checkpoint = Some(i),
                    }
                }
            }
            if let Some(tag) = &self.options.checkpoint_tag
                && checkpoint.is_none()
            {
                return Err(crate::UserError::CheckpointTag { tag: tag.clone() }.into());
            }
            if let Some(i) = checkpoint {
                debug!(file = %files[i].name, "starting from checkpoint");
                start = i;
            }
        }

        let mut pending = Vec::new();
        for file in &files[start..] {
            match revisions.iter().find(|r| r.version == file.version) {
                Some(rev) if rev.ok() => {}
                Some(rev) => pending.push((file.clone(), rev.applied, Some(rev.clone()))),
                None => pending.push((file.clone(), 0, None)),
            }
        }
        Ok(pending)
    }

    fn execute_file(
        &mut self,
        file: &MigrationFile,
        resume_from: usize,
        existing: Option<Revision>,
        hashes: &HashFile,
        report: &mut ExecuteReport,
    ) -> Result<()> {
        let content = self.dir.read_file_utf8(&file.name)?;
        let stmts = scan_stmts(&content)?;
        debug!(file = %file.name, statements = stmts.len(), resume_from, "executing migration file");

        if !self.analyzers.is_empty() {
            let file_report =
                run_analyzers(&file.name, &stmts, &self.analyzers, &self.recognizers);
            for diagnostic in &file_report.diagnostics {
                if self.options.severity.severity(&diagnostic.code) == Severity::Error {
                    return Err(Error::Lint {
                        file: file.name.clone(),
                        code: diagnostic.code.clone(),
                        text: diagnostic.text.clone(),
                    });
                }
            }
            if !file_report.diagnostics.is_empty() {
                report.reports.push(file_report);
            }
        }

        let mut revision = existing.unwrap_or_else(|| {
            Revision::new(&file.version, &file.description)
        });
        // Resuming is only safe when the statements already applied are
        // byte-identical to what ran last time.
        for (i, stmt) in stmts.iter().take(resume_from).enumerate() {
            let recorded = revision.partial_hashes.get(i).map(String::as_str);
            if recorded != Some(hash_content(stmt.text.as_bytes()).as_str()) {
                return Err(StateError::RevisionHash {
                    file: file.name.clone(),
                    version: file.version.clone(),
                }
                .into());
            }
        }

        revision.total = stmts.len();
        revision.hash = hashes
            .file_hash(&file.name)
            .unwrap_or_default()
            .to_string();
        revision.operator_version = self.options.operator_version.clone();

        let table = self.options.revision_table.clone();
        let transactional = self.driver.transactional_ddl();
        let started = Instant::now();
        if transactional {
            self.driver.begin()?;
        }

        for (index, stmt) in stmts.iter().enumerate().skip(resume_from) {
            if let Err(source) = self.driver.exec(&stmt.text) {
                if transactional {
                    self.driver.rollback()?;
                    revision.applied = resume_from;
                    revision.partial_hashes.truncate(resume_from);
                }
                revision.error = Some(source.to_string());
                revision.error_stmt = Some(stmt.text.clone());
                revision.executed_at = Utc::now();
                revision.execution_time_ms = started.elapsed().as_millis() as u64;
                self.driver.write_revision(&table, &revision)?;
                return Err(Error::Statement {
                    file: file.name.clone(),
                    index,
                    stmt: stmt.text.clone(),
                    message: source.to_string(),
                });
            }
            revision.applied = index + 1;
            revision.partial_hashes
                .push(hash_content(stmt.text.as_bytes()));
            if !transactional {
                // Progressive recording keeps the log honest if the
                // process dies between statements.
                revision.executed_at = Utc::now();
                revision.execution_time_ms = started.elapsed().as_millis() as u64;
                self.driver.write_revision(&table, &revision)?;
            }
        }

        revision.error = None;
        revision.error_stmt = None;
        revision.executed_at = Utc::now();
        revision.execution_time_ms = started.elapsed().as_millis() as u64;
        if transactional {
            self.driver.write_revision(&table, &revision)?;
            self.driver.commit()?;
        } else {
            self.driver.write_revision(&table, &revision)?;
        }
        Ok(())
    }
}

fn validate_versions(files: &[MigrationFile]) -> Result<()> {
    for pair in files.windows(2) {
        if pair[0].version >= pair[1].version {
            return Err(StateError::VersionOrder {
                prev: pair[0].version.clone(),
                next: pair[1].version.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Detect history rewrites and silent file edits before any write:
/// every recorded revision must exist in the directory, no unrecorded file
/// may precede a recorded version, and cleanly applied files must still
/// hash to what the log remembers.
fn check_history(
    files: &[MigrationFile],
    revisions: &[Revision],
    hashes: &HashFile,
) -> Result<()> {
    for revision in revisions {
        if !files.iter().any(|f| f.version == revision.version) {
            return Err(StateError::UnknownRevision {
                version: revision.version.clone(),
            }
            .into());
        }
    }

    if let Some(max_recorded) = revisions.iter().map(|r| r.version.as_str()).max() {
        for file in files {
            let recorded = revisions.iter().any(|r| r.version == file.version);
            if !recorded && file.version.as_str() < max_recorded {
                return Err(StateError::HistoryRewrite {
                    file: file.name.clone(),
                    version: max_recorded.to_string(),
                }
                .into());
            }
        }
    }

    for revision in revisions.iter().filter(|r| r.ok()) {
        let file = files
            .iter()
            .find(|f| f.version == revision.version)
            .expect("checked above");
        if hashes.file_hash(&file.name) != Some(revision.hash.as_str()) {
            return Err(StateError::RevisionHash {
                file: file.name.clone(),
                version: revision.version.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Advisory-lock name derived from the directory path, so concurrent
/// agents targeting the same directory contend on the same name.
pub fn execution_lock_name(dir: &LocalDir) -> String {
    let canonical = dir
        .path()
        .canonicalize()
        .unwrap_or_else(|_| dir.path().to_path_buf());
    let digest = Sha256::digest(canonical.display().to_string().as_bytes());
    let mut short = String::new();
    for byte in digest.iter().take(8) {
        short.push_str(&format!("{byte:02x}"));
    }
    format!("atlas_migration_{short}")
}
