use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use atlas_core::{Error, Result};

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// SQLite has no session-scoped advisory locks, so the locker uses the
/// filesystem next to the database file: creating the marker exclusively
/// is the acquisition. A zero timeout makes a single attempt.
pub fn acquire(db_path: Option<&Path>, name: &str, timeout: Duration) -> Result<()> {
    let marker = marker_path(db_path, name);
    let deadline = Instant::now() + timeout;
    loop {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&marker)
        {
            Ok(_) => {
                debug!(lock = name, path = %marker.display(), "acquired directory lock");
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if Instant::now() >= deadline {
                    return Err(Error::LockTimeout {
                        name: name.to_string(),
                    });
                }
                std::thread::sleep(RETRY_INTERVAL.min(timeout));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub fn release(db_path: Option<&Path>, name: &str) -> Result<()> {
    let marker = marker_path(db_path, name);
    match fs::remove_file(&marker) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Lock markers live next to the database file so agents pointed at the
/// same database contend on the same path. In-memory databases fall back
/// to the system scratch directory.
fn marker_path(db_path: Option<&Path>, name: &str) -> PathBuf {
    let dir = db_path
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(std::env::temp_dir);
    dir.join(format!(".{name}.lock"))
}
