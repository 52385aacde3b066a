use chrono::{Duration, Utc};
use rusqlite::{Connection, Row, params, params_from_iter};
use std::collections::HashMap;

use desirepath_types::{
    Desire, DesireFilter, DesireStats, PathDetail, PathEntry, format_timestamp,
};

use crate::{CancelToken, Error, Result};

pub fn record(conn: &Connection, desire: &Desire, cancel: &CancelToken) -> Result<()> {
    let tool_input = desire.tool_input.as_ref().map(value_to_text).transpose()?;
    let metadata = desire.metadata.as_ref().map(value_to_text).transpose()?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        r#"
        INSERT INTO desires (id, tool_name, tool_input, error, category, source,
                             instance_id, cwd, created_at, metadata)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            &desire.id,
            &desire.tool_name,
            &tool_input,
            &desire.error,
            &desire.category,
            &desire.source,
            &desire.instance_id,
            &desire.cwd,
            &desire.created_at,
            &metadata,
        ],
    )
    .map_err(|err| duplicate_or_database(err, &desire.id))?;

    // A cancellation that lands while the row is in flight must leave no
    // trace: dropping the transaction rolls it back
    cancel.check()?;
    tx.commit()?;

    Ok(())
}

pub fn list(conn: &Connection, filter: &DesireFilter) -> Result<Vec<Desire>> {
    let mut sql = String::from(
        "SELECT id, tool_name, tool_input, error, category, source, \
         instance_id, cwd, created_at, metadata FROM desires",
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
    if let Some(tool) = &filter.tool {
        clauses.push("tool_name = ?");
        args.push(tool.clone());
    }
    if let Some(category) = &filter.category {
        clauses.push("category = ?");
        args.push(category.clone());
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
    let desires = stmt
        .query_map(params_from_iter(args.iter()), row_to_desire)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let desires = desires.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(desires)
}

/// Frequency paths: desired tool names ranked by count, left-joined
/// against name-only aliases so the operator sees what is already mapped.
pub fn get_paths(conn: &Connection, since: Option<&str>, top: usize) -> Result<Vec<PathEntry>> {
    let mut sql = String::from(
        r#"
        SELECT d.tool_name, COUNT(*) AS cnt, MAX(d.created_at) AS last_seen, a.to_name
        FROM desires d
        LEFT JOIN aliases a
            ON a.from_name = d.tool_name
            AND a.tool = '' AND a.param = '' AND a.command = '' AND a.match_kind = ''
        "#,
    );
    let mut args: Vec<String> = Vec::new();
    if let Some(since) = since {
        sql.push_str(" WHERE d.created_at >= ?");
        args.push(since.to_string());
    }
    sql.push_str(" GROUP BY d.tool_name ORDER BY cnt DESC, d.tool_name ASC");
    sql.push_str(&format!(" LIMIT {}", top));

    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok(PathEntry {
                tool_name: row.get(0)?,
                count: row.get(1)?,
                last_seen: row.get(2)?,
                alias_to: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(entries)
}

pub fn inspect_path(
    conn: &Connection,
    pattern: &str,
    since: Option<&str>,
    top: usize,
) -> Result<PathDetail> {
    // `%` activates prefix/infix matching, otherwise the name must match
    // exactly.
    let match_clause = if pattern.contains('%') {
        "tool_name LIKE ?"
    } else {
        "tool_name = ?"
    };
    let (since_clause, mut args) = match since {
        Some(since) => (
            " AND created_at >= ?",
            vec![pattern.to_string(), since.to_string()],
        ),
        None => ("", vec![pattern.to_string()]),
    };

    let (total, first_seen, last_seen) = conn.query_row(
        &format!(
            "SELECT COUNT(*), MIN(created_at), MAX(created_at) FROM desires WHERE {}{}",
            match_clause, since_clause
        ),
        params_from_iter(args.iter()),
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        },
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM desires \
         WHERE {}{} GROUP BY day ORDER BY day ASC",
        match_clause, since_clause
    ))?;
    let per_day = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let top_inputs = grouped_column(conn, "tool_input", match_clause, since_clause, &args, top)?;
    let top_errors = grouped_column(conn, "error", match_clause, since_clause, &args, top)?;

    // Alias lookup uses the literal pattern; wildcard inspections rarely
    // correspond to a single installed alias.
    args.truncate(1);
    let alias_to = conn
        .query_row(
            "SELECT to_name FROM aliases WHERE from_name = ?1 \
             AND tool = '' AND param = '' AND command = '' AND match_kind = ''",
            params_from_iter(args.iter()),
            |row| row.get(0),
        )
        .ok();

    Ok(PathDetail {
        pattern: pattern.to_string(),
        total,
        first_seen,
        last_seen,
        per_day,
        top_inputs,
        top_errors,
        alias_to,
    })
}

pub fn stats(conn: &Connection) -> Result<DesireStats> {
    let (total, unique_tools, earliest, latest) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT tool_name), MIN(created_at), MAX(created_at) \
         FROM desires",
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

    let mut top_sources = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT source, COUNT(*) AS cnt FROM desires WHERE source IS NOT NULL \
         GROUP BY source ORDER BY cnt DESC LIMIT 10",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (source, count) = row?;
        top_sources.insert(source, count);
    }

    let mut stmt = conn.prepare(
        "SELECT tool_name, COUNT(*) AS cnt FROM desires \
         GROUP BY tool_name ORDER BY cnt DESC, tool_name ASC LIMIT 10",
    )?;
    let top_tools = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(DesireStats {
        total,
        unique_tools,
        top_sources,
        top_tools,
        earliest,
        latest,
        last_24h: window_count(conn, "desires", Duration::hours(24))?,
        last_7d: window_count(conn, "desires", Duration::days(7))?,
        last_30d: window_count(conn, "desires", Duration::days(30))?,
    })
}

/// Count rows within a sliding window against the current UTC wall clock.
pub fn window_count(conn: &Connection, table: &str, window: Duration) -> Result<i64> {
    let cutoff = format_timestamp(Utc::now() - window);
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE created_at >= ?1", table),
        [cutoff],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn grouped_column(
    conn: &Connection,
    column: &str,
    match_clause: &str,
    since_clause: &str,
    args: &[String],
    top: usize,
) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {col}, COUNT(*) AS cnt FROM desires \
         WHERE {col} IS NOT NULL AND {m}{s} \
         GROUP BY {col} ORDER BY cnt DESC LIMIT {top}",
        col = column,
        m = match_clause,
        s = since_clause,
        top = top,
    ))?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_desire(row: &Row<'_>) -> rusqlite::Result<Result<Desire>> {
    let tool_input: Option<String> = row.get(2)?;
    let metadata: Option<String> = row.get(9)?;
    Ok(build_desire(
        Desire {
            id: row.get(0)?,
            tool_name: row.get(1)?,
            tool_input: None,
            error: row.get(3)?,
            category: row.get(4)?,
            source: row.get(5)?,
            instance_id: row.get(6)?,
            cwd: row.get(7)?,
            created_at: row.get(8)?,
            metadata: None,
        },
        tool_input,
        metadata,
    ))
}

fn build_desire(
    mut desire: Desire,
    tool_input: Option<String>,
    metadata: Option<String>,
) -> Result<Desire> {
    desire.tool_input = tool_input.as_deref().map(text_to_value).transpose()?;
    desire.metadata = metadata.as_deref().map(text_to_value).transpose()?;
    Ok(desire)
}

pub(crate) fn value_to_text(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string(value).map_err(|err| Error::Invalid(format!("bad JSON column: {}", err)))
}

pub(crate) fn text_to_value(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|err| Error::Invalid(format!("bad JSON column: {}", err)))
}

pub(crate) fn duplicate_or_database(err: rusqlite::Error, id: &str) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Duplicate(id.to_string())
        }
        _ => Error::Database(err),
    }
}
