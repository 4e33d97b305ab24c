use std::time::Duration;

use mysql::PooledConn;
use mysql::prelude::Queryable;
use tracing::debug;

use atlas_core::{Error, Result};

use crate::exec_error;

/// Session-scoped advisory lock via `GET_LOCK`. The server does the
/// waiting, so the timeout is passed through in whole seconds (zero means
/// a single immediate attempt).
pub fn acquire(conn: &mut PooledConn, name: &str, timeout: Duration) -> Result<()> {
    let acquired: Option<i64> = conn
        .exec_first(
            "SELECT GET_LOCK(?, ?)",
            (name, timeout.as_secs() as i64),
        )
        .map_err(exec_error)?
        .flatten();
    match acquired {
        Some(1) => {
            debug!(lock = name, "acquired advisory lock");
            Ok(())
        }
        _ => Err(Error::LockTimeout {
            name: name.to_string(),
        }),
    }
}

pub fn release(conn: &mut PooledConn, name: &str) -> Result<()> {
    let _: Option<Option<i64>> = conn
        .exec_first("SELECT RELEASE_LOCK(?)", (name,))
        .map_err(exec_error)?;
    Ok(())
}
