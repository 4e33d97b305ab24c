use std::time::Instant;

use tracing::debug;

use crate::{Conn, Error, Plan, Result, Tx};

/// Execute a plan's statements in emitted order. The whole plan runs in
/// one transaction when both the plan and the connection allow it; other
/// dialects get per-statement execution. A deadline stops the run before
/// the next statement starts; statements already in flight finish through
/// driver cancellation.
pub fn apply_plan(conn: &mut dyn Conn, plan: &Plan, deadline: Option<Instant>) -> Result<()> {
    debug!(plan = %plan.name, statements = plan.changes.len(), "applying plan");
    if plan.transactional && conn.transactional_ddl() {
        let mut tx = Tx::open(conn)?;
        for (index, change) in plan.changes.iter().enumerate() {
            check_deadline(deadline, index)?;
            tx.exec(&change.cmd)?;
        }
        tx.commit()
    } else {
        for (index, change) in plan.changes.iter().enumerate() {
            check_deadline(deadline, index)?;
            conn.exec(&change.cmd)?;
        }
        Ok(())
    }
}

fn check_deadline(deadline: Option<Instant>, index: usize) -> Result<()> {
    if let Some(deadline) = deadline
        && Instant::now() >= deadline
    {
        return Err(Error::Deadline { index });
    }
    Ok(())
}
