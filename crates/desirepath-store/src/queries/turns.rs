use rusqlite::{Connection, params_from_iter};
use std::collections::{BTreeMap, HashSet};

use desirepath_types::{
    ToolTurnStat, TurnFilter, TurnPatternStat, TurnRow, canonicalize_pattern,
};

use crate::Result;

/// Reconstruct turns from the invocation stream: rows with a non-empty
/// turn identifier, grouped by it, tool names in `turn_sequence` order.
fn load_turns(conn: &Connection, since: Option<&str>) -> Result<Vec<TurnRow>> {
    let mut sql = String::from(
        "SELECT turn_id, tool_name FROM invocations \
         WHERE turn_id IS NOT NULL AND turn_id <> ''",
    );
    let mut args: Vec<String> = Vec::new();
    if let Some(since) = since {
        sql.push_str(" AND created_at >= ?");
        args.push(since.to_string());
    }
    sql.push_str(" ORDER BY turn_id, turn_sequence, id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (turn_id, tool_name) in rows {
        grouped.entry(turn_id).or_default().push(tool_name);
    }

    let turns = grouped
        .into_iter()
        .map(|(turn_id, tools)| {
            let (session_id, turn_index) = TurnRow::split_turn_id(&turn_id);
            TurnRow {
                turn_id,
                session_id,
                turn_index,
                length: tools.len() as i64,
                tools,
            }
        })
        .collect();

    Ok(turns)
}

pub fn list(conn: &Connection, filter: &TurnFilter) -> Result<Vec<TurnRow>> {
    let min_length = filter.min_length.unwrap_or(0);
    let mut turns: Vec<TurnRow> = load_turns(conn, filter.since.as_deref())?
        .into_iter()
        .filter(|turn| turn.length >= min_length)
        .filter(|turn| match &filter.session {
            Some(session) => turn.session_id == *session,
            None => true,
        })
        .filter(|turn| match &filter.pattern {
            Some(pattern) => canonicalize_pattern(&turn.tools) == *pattern,
            None => true,
        })
        .collect();

    turns.sort_by(|a, b| b.length.cmp(&a.length).then(a.turn_id.cmp(&b.turn_id)));
    if let Some(limit) = filter.limit {
        turns.truncate(limit);
    }

    Ok(turns)
}

pub fn pattern_stats(
    conn: &Connection,
    min_length: i64,
    since: Option<&str>,
) -> Result<Vec<TurnPatternStat>> {
    let turns = load_turns(conn, since)?;

    struct Acc {
        count: i64,
        total_length: i64,
        sessions: HashSet<String>,
    }

    let mut grouped: BTreeMap<String, Acc> = BTreeMap::new();
    for turn in turns.iter().filter(|t| t.length >= min_length) {
        let pattern = canonicalize_pattern(&turn.tools);
        let acc = grouped.entry(pattern).or_insert_with(|| Acc {
            count: 0,
            total_length: 0,
            sessions: HashSet::new(),
        });
        acc.count += 1;
        acc.total_length += turn.length;
        acc.sessions.insert(turn.session_id.clone());
    }

    let mut stats: Vec<TurnPatternStat> = grouped
        .into_iter()
        .map(|(pattern, acc)| TurnPatternStat {
            pattern,
            count: acc.count,
            avg_length: acc.total_length as f64 / acc.count as f64,
            sessions: acc.sessions.len() as i64,
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count).then(a.pattern.cmp(&b.pattern)));
    Ok(stats)
}

pub fn tool_stats(
    conn: &Connection,
    min_length: i64,
    since: Option<&str>,
) -> Result<Vec<ToolTurnStat>> {
    let turns = load_turns(conn, since)?;

    struct Acc {
        occurrences: i64,
        total_turn_length: i64,
        long_occurrences: i64,
    }

    let mut grouped: BTreeMap<String, Acc> = BTreeMap::new();
    for turn in &turns {
        let is_long = turn.length >= min_length;
        for tool in &turn.tools {
            let acc = grouped.entry(tool.clone()).or_insert_with(|| Acc {
                occurrences: 0,
                total_turn_length: 0,
                long_occurrences: 0,
            });
            acc.occurrences += 1;
            acc.total_turn_length += turn.length;
            if is_long {
                acc.long_occurrences += 1;
            }
        }
    }

    let mut stats: Vec<ToolTurnStat> = grouped
        .into_iter()
        .filter(|(_, acc)| acc.long_occurrences > 0)
        .map(|(tool_name, acc)| {
            let pct = acc.long_occurrences as f64 / acc.occurrences as f64 * 100.0;
            ToolTurnStat {
                tool_name,
                occurrences: acc.occurrences,
                avg_turn_length: acc.total_turn_length as f64 / acc.occurrences as f64,
                long_turn_occurrences: acc.long_occurrences,
                long_turn_pct: (pct * 10.0).round() / 10.0,
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then(a.tool_name.cmp(&b.tool_name))
    });
    Ok(stats)
}
