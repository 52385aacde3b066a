use rusqlite::{Connection, OptionalExtension, Row, params};

use desirepath_types::{AliasKey, AliasRule};

use crate::{CancelToken, Result};

pub fn set(conn: &Connection, alias: &AliasRule, cancel: &CancelToken) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        r#"
        INSERT INTO aliases (from_name, tool, param, command, match_kind,
                             to_name, message, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(from_name, tool, param, command, match_kind) DO UPDATE SET
            to_name = ?6,
            message = ?7,
            created_at = ?8
        "#,
        params![
            &alias.from,
            &alias.tool,
            &alias.param,
            &alias.command,
            &alias.match_kind,
            &alias.to,
            &alias.message,
            &alias.created_at,
        ],
    )?;

    // Cancelled mid-upsert: the dropped transaction rolls it back
    cancel.check()?;
    tx.commit()?;

    Ok(())
}

pub fn get(conn: &Connection, key: &AliasKey) -> Result<Option<AliasRule>> {
    let alias = conn
        .query_row(
            r#"
            SELECT from_name, tool, param, command, match_kind, to_name, message, created_at
            FROM aliases
            WHERE from_name = ?1 AND tool = ?2 AND param = ?3 AND command = ?4 AND match_kind = ?5
            "#,
            params![&key.from, &key.tool, &key.param, &key.command, &key.match_kind],
            row_to_alias,
        )
        .optional()?;

    Ok(alias)
}

pub fn get_all(conn: &Connection) -> Result<Vec<AliasRule>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT from_name, tool, param, command, match_kind, to_name, message, created_at
        FROM aliases
        ORDER BY from_name, tool, param, command, match_kind
        "#,
    )?;

    let aliases = stmt
        .query_map([], row_to_alias)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(aliases)
}

pub fn delete(conn: &Connection, key: &AliasKey, cancel: &CancelToken) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let removed = tx.execute(
        r#"
        DELETE FROM aliases
        WHERE from_name = ?1 AND tool = ?2 AND param = ?3 AND command = ?4 AND match_kind = ?5
        "#,
        params![&key.from, &key.tool, &key.param, &key.command, &key.match_kind],
    )?;

    cancel.check()?;
    tx.commit()?;

    Ok(removed > 0)
}

/// Parameter/command rules scoped to one tool. Name-only aliases carry an
/// empty `tool` and are never returned here.
pub fn rules_for_tool(conn: &Connection, tool: &str) -> Result<Vec<AliasRule>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT from_name, tool, param, command, match_kind, to_name, message, created_at
        FROM aliases
        WHERE tool = ?1 AND tool <> ''
        ORDER BY from_name, param, command, match_kind
        "#,
    )?;

    let rules = stmt
        .query_map([tool], row_to_alias)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rules)
}

fn row_to_alias(row: &Row<'_>) -> rusqlite::Result<AliasRule> {
    Ok(AliasRule {
        from: row.get(0)?,
        tool: row.get(1)?,
        param: row.get(2)?,
        command: row.get(3)?,
        match_kind: row.get(4)?,
        to: row.get(5)?,
        message: row.get(6)?,
        created_at: row.get(7)?,
    })
}
