use rusqlite::{Connection, Transaction};

use crate::{Error, Result};

/// Current schema version (increment when adding a migration)
pub const SCHEMA_VERSION: i64 = 3;

// NOTE: Migration Design Rationale
//
// Why forward-only, additive migrations?
// - Multiple assistant instances share one database file; an older client
//   may still be running while a newer one migrates
// - Columns are therefore never dropped or reordered, only appended
// - New columns carry defaults that preserve the prior semantic for
//   existing rows (turn columns default to empty string / zero)
//
// Why one transaction per migration?
// - A crash mid-upgrade leaves the database at a well-defined version
// - The version row only advances after the step commits

/// Ensure the version table exists, read the current version and apply
/// each pending migration in order, each inside its own transaction.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
    )?;

    let mut version = current_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(Error::Invalid(format!(
            "database schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    while version < SCHEMA_VERSION {
        let next = version + 1;
        let tx = conn.transaction()?;
        apply_migration(&tx, next)?;
        set_version(&tx, next)?;
        tx.commit()?;
        version = next;
    }

    Ok(())
}

/// Read the single version row; a fresh database reports 0.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_version(tx: &Transaction<'_>, version: i64) -> Result<()> {
    let updated = tx.execute("UPDATE schema_version SET version = ?1", [version])?;
    if updated == 0 {
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    }
    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i64) -> Result<()> {
    match version {
        1 => migrate_to_v1(tx),
        2 => migrate_to_v2(tx),
        3 => migrate_to_v3(tx),
        other => Err(Error::Invalid(format!("unknown schema version {}", other))),
    }
}

/// v1: desires and the composite-keyed alias table.
fn migrate_to_v1(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS desires (
            id TEXT PRIMARY KEY,
            tool_name TEXT NOT NULL,
            tool_input TEXT,
            error TEXT NOT NULL,
            category TEXT,
            source TEXT,
            instance_id TEXT,
            cwd TEXT,
            created_at TEXT NOT NULL,
            metadata TEXT
        );

        CREATE TABLE IF NOT EXISTS aliases (
            from_name TEXT NOT NULL,
            tool TEXT NOT NULL DEFAULT '',
            param TEXT NOT NULL DEFAULT '',
            command TEXT NOT NULL DEFAULT '',
            match_kind TEXT NOT NULL DEFAULT '',
            to_name TEXT NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            PRIMARY KEY (from_name, tool, param, command, match_kind)
        );

        CREATE INDEX IF NOT EXISTS idx_desires_created ON desires(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_desires_tool ON desires(tool_name);
        "#,
    )?;
    Ok(())
}

/// v2: the invocation stream (every tool call, successful or not).
fn migrate_to_v2(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS invocations (
            id TEXT PRIMARY KEY,
            source TEXT,
            instance_id TEXT,
            host_id TEXT,
            tool_name TEXT NOT NULL,
            is_error INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            cwd TEXT,
            created_at TEXT NOT NULL,
            metadata TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_invocations_created ON invocations(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_invocations_tool ON invocations(tool_name);
        "#,
    )?;
    Ok(())
}

/// v3: turn coordinates on invocations. Pre-existing rows keep the
/// documented defaults (empty turn id, zero sequence and length).
fn migrate_to_v3(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        ALTER TABLE invocations ADD COLUMN turn_id TEXT DEFAULT '';
        ALTER TABLE invocations ADD COLUMN turn_sequence INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE invocations ADD COLUMN turn_length INTEGER NOT NULL DEFAULT 0;
        "#,
    )?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_invocations_turn ON invocations(turn_id, turn_sequence)",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_migrates_to_current() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_at_current_version_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        init_schema(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER NOT NULL);
             INSERT INTO schema_version (version) VALUES (99);",
        )
        .unwrap();
        assert!(init_schema(&mut conn).is_err());
    }

    #[test]
    fn test_version_row_is_single_integer() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
