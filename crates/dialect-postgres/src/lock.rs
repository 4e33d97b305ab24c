use std::time::{Duration, Instant};

use postgres::Client;
use sha2::{Digest, Sha256};
use tracing::debug;

use atlas_core::{Error, Result};

use crate::exec_error;

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Session-scoped advisory lock. The name is hashed into the bigint key
/// space `pg_try_advisory_lock` works on; acquisition polls until the
/// timeout, so a zero timeout is a single attempt.
pub fn acquire(client: &mut Client, name: &str, timeout: Duration) -> Result<()> {
    let key = lock_key(name);
    let deadline = Instant::now() + timeout;
    loop {
        let row = client
            .query_one("SELECT pg_try_advisory_lock($1)", &[&key])
            .map_err(exec_error)?;
        let acquired: bool = row.get(0);
        if acquired {
            debug!(lock = name, key, "acquired advisory lock");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::LockTimeout {
                name: name.to_string(),
            });
        }
        std::thread::sleep(RETRY_INTERVAL.min(timeout));
    }
}

pub fn release(client: &mut Client, name: &str) -> Result<()> {
    let key = lock_key(name);
    client
        .execute("SELECT pg_advisory_unlock($1)", &[&key])
        .map_err(exec_error)?;
    Ok(())
}

fn lock_key(name: &str) -> i64 {
    let digest = Sha256::digest(name.as_bytes());
    i64::from_be_bytes(digest[..8].try_into().expect("8 bytes"))
}
