use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use desirepath_types::{
    AliasKey, AliasRule, Desire, DesireFilter, DesireStats, Invocation, InvocationFilter,
    InvocationStats, PathDetail, PathEntry, ToolTurnStat, TurnFilter, TurnPatternStat, TurnRow,
};

use crate::cancel::CancelToken;
use crate::traits::Store;
use crate::{Result, queries, schema};

// NOTE: Concurrency Rationale
//
// One connection, WAL journaling, bounded busy timeout. Writes from this
// handle are totally ordered; concurrent handles (other assistant
// instances) rely on SQLite's own locking for at-most-one-writer. This is
// a correctness choice: the hook path fires from short-lived processes
// and must never corrupt the shared file.
//
// Cancellation is cooperative: every entry point checks the caller's
// token first, and writes check again inside their transaction before
// commit so a cancellation observed mid-write rolls back cleanly.

/// SQLite-backed store. The parent directory of the database file is
/// created on open; the file handle is released on drop.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(db_path)?;
        // journal_mode returns the resulting mode as a row
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.busy_timeout(Duration::from_secs(5))?;

        schema::init_schema(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::init_schema(&mut conn)?;
        Ok(Self { conn })
    }

    /// Schema version of the opened database.
    pub fn schema_version(&self) -> Result<i64> {
        schema::current_version(&self.conn)
    }
}

impl Store for LocalStore {
    fn record_desire(&self, desire: &Desire, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        queries::desires::record(&self.conn, desire, cancel)
    }

    fn list_desires(&self, filter: &DesireFilter, cancel: &CancelToken) -> Result<Vec<Desire>> {
        cancel.check()?;
        queries::desires::list(&self.conn, filter)
    }

    fn get_paths(
        &self,
        since: Option<&str>,
        top: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<PathEntry>> {
        cancel.check()?;
        queries::desires::get_paths(&self.conn, since, top)
    }

    fn inspect_path(
        &self,
        pattern: &str,
        since: Option<&str>,
        top: usize,
        cancel: &CancelToken,
    ) -> Result<PathDetail> {
        cancel.check()?;
        queries::desires::inspect_path(&self.conn, pattern, since, top)
    }

    fn stats(&self, cancel: &CancelToken) -> Result<DesireStats> {
        cancel.check()?;
        queries::desires::stats(&self.conn)
    }

    fn set_alias(&self, alias: &AliasRule, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        queries::aliases::set(&self.conn, alias, cancel)
    }

    fn get_alias(&self, key: &AliasKey, cancel: &CancelToken) -> Result<Option<AliasRule>> {
        cancel.check()?;
        queries::aliases::get(&self.conn, key)
    }

    fn get_aliases(&self, cancel: &CancelToken) -> Result<Vec<AliasRule>> {
        cancel.check()?;
        queries::aliases::get_all(&self.conn)
    }

    fn delete_alias(&self, key: &AliasKey, cancel: &CancelToken) -> Result<bool> {
        cancel.check()?;
        queries::aliases::delete(&self.conn, key, cancel)
    }

    fn get_rules_for_tool(&self, tool: &str, cancel: &CancelToken) -> Result<Vec<AliasRule>> {
        cancel.check()?;
        queries::aliases::rules_for_tool(&self.conn, tool)
    }

    fn record_invocation(&self, invocation: &Invocation, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        queries::invocations::record(&self.conn, invocation, cancel)
    }

    fn list_invocations(
        &self,
        filter: &InvocationFilter,
        cancel: &CancelToken,
    ) -> Result<Vec<Invocation>> {
        cancel.check()?;
        queries::invocations::list(&self.conn, filter)
    }

    fn invocation_stats(&self, cancel: &CancelToken) -> Result<InvocationStats> {
        cancel.check()?;
        queries::invocations::stats(&self.conn)
    }

    fn list_turns(&self, filter: &TurnFilter, cancel: &CancelToken) -> Result<Vec<TurnRow>> {
        cancel.check()?;
        queries::turns::list(&self.conn, filter)
    }

    fn turn_pattern_stats(
        &self,
        min_length: i64,
        since: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<TurnPatternStat>> {
        cancel.check()?;
        queries::turns::pattern_stats(&self.conn, min_length, since)
    }

    fn tool_turn_stats(
        &self,
        min_length: i64,
        since: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<ToolTurnStat>> {
        cancel.check()?;
        queries::turns::tool_stats(&self.conn, min_length, since)
    }
}
