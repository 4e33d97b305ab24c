use crate::Result;

/// Statement-execution surface shared by the applier and the migration
/// executor. Dialect crates wrap their native clients behind this.
pub trait Conn {
    fn exec(&mut self, sql: &str) -> Result<()>;
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    /// Whether DDL participates in transactions on this dialect. When
    /// false, callers fall back to per-statement execution and surface the
    /// non-atomicity on the plan.
    fn transactional_ddl(&self) -> bool;
}

/// Transaction guard. Rolls back on drop unless committed, so an early
/// return on error never leaves an open transaction behind.
pub struct Tx<'a> {
    conn: &'a mut dyn Conn,
    done: bool,
}

impl<'a> Tx<'a> {
    pub fn open(conn: &'a mut dyn Conn) -> Result<Self> {
        conn.begin()?;
        Ok(Self { conn, done: false })
    }

    pub fn exec(&mut self, sql: &str) -> Result<()> {
        self.conn.exec(sql)
    }

    pub fn commit(mut self) -> Result<()> {
        self.done = true;
        self.conn.commit()
    }

    pub fn rollback(mut self) -> Result<()> {
        self.done = true;
        self.conn.rollback()
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.conn.rollback();
        }
    }
}
