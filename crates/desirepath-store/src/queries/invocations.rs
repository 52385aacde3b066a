use chrono::Duration;
use rusqlite::{Connection, Row, params, params_from_iter};
use std::collections::HashMap;

use desirepath_types::{Invocation, InvocationFilter, InvocationStats};

use crate::{CancelToken, Result};

use super::desires::{duplicate_or_database, text_to_value, value_to_text, window_count};

pub fn record(conn: &Connection, invocation: &Invocation, cancel: &CancelToken) -> Result<()> {
    let metadata = invocation.metadata.as_ref().map(value_to_text).transpose()?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        r#"
        INSERT INTO invocations (id, source, instance_id, host_id, tool_name, is_error,
                                 error, cwd, created_at, metadata,
                                 turn_id, turn_sequence, turn_length)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            &invocation.id,
            &invocation.source,
            &invocation.instance_id,
            &invocation.host_id,
            &invocation.tool_name,
            invocation.is_error,
            &invocation.error,
            &invocation.cwd,
            &invocation.created_at,
            &metadata,
            &invocation.turn_id,
            invocation.turn_sequence,
            invocation.turn_length,
        ],
    )
    .map_err(|err| duplicate_or_database(err, &invocation.id))?;

    // Cancelled mid-write: the dropped transaction rolls the row back
    cancel.check()?;
    tx.commit()?;

    Ok(())
}

pub fn list(conn: &Connection, filter: &InvocationFilter) -> Result<Vec<Invocation>> {
    let mut sql = String::from(
        "SELECT id, source, instance_id, host_id, tool_name, is_error, error, cwd, \
         created_at, metadata, turn_id, turn_sequence, turn_length FROM invocations",
    );
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if let Some(since) = &filter.since {
        clauses.push("created_at >= ?");
        args.push(since.clone());
    }
    if let Some(source) = &filter.source {
        clauses.push("source = ?");
        args.push(source.clone());
    }
    if let Some(instance) = &filter.instance {
        clauses.push("instance_id = ?");
        args.push(instance.clone());
    }
    if let Some(tool) = &filter.tool {
        clauses.push("tool_name = ?");
        args.push(tool.clone());
    }
    if filter.errors_only {
        clauses.push("is_error = 1");
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let invocations = stmt
        .query_map(params_from_iter(args.iter()), row_to_invocation)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let invocations = invocations.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(invocations)
}

pub fn stats(conn: &Connection) -> Result<InvocationStats> {
    let (total, unique_tools, earliest, latest) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT tool_name), MIN(created_at), MAX(created_at) \
         FROM invocations",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT tool_name, COUNT(*) AS cnt FROM invocations \
         GROUP BY tool_name ORDER BY cnt DESC, tool_name ASC LIMIT 10",
    )?;
    let top_tools = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut top_sources = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT source, COUNT(*) AS cnt FROM invocations WHERE source IS NOT NULL \
         GROUP BY source ORDER BY cnt DESC LIMIT 10",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (source, count) = row?;
        top_sources.insert(source, count);
    }

    Ok(InvocationStats {
        total,
        unique_tools,
        top_tools,
        top_sources,
        earliest,
        latest,
        last_24h: window_count(conn, "invocations", Duration::hours(24))?,
        last_7d: window_count(conn, "invocations", Duration::days(7))?,
        last_30d: window_count(conn, "invocations", Duration::days(30))?,
    })
}

fn row_to_invocation(row: &Row<'_>) -> rusqlite::Result<Result<Invocation>> {
    let metadata: Option<String> = row.get(9)?;
    let turn_id: Option<String> = row.get(10)?;

    let invocation = Invocation {
        id: row.get(0)?,
        source: row.get(1)?,
        instance_id: row.get(2)?,
        host_id: row.get(3)?,
        tool_name: row.get(4)?,
        is_error: row.get(5)?,
        error: row.get(6)?,
        cwd: row.get(7)?,
        created_at: row.get(8)?,
        metadata: None,
        // The migration default for pre-turn rows is the empty string;
        // surface it as absent.
        turn_id: turn_id.filter(|id| !id.is_empty()),
        turn_sequence: row.get(11)?,
        turn_length: row.get(12)?,
    };

    Ok(attach_metadata(invocation, metadata))
}

fn attach_metadata(mut invocation: Invocation, metadata: Option<String>) -> Result<Invocation> {
    invocation.metadata = metadata.as_deref().map(text_to_value).transpose()?;
    Ok(invocation)
}
