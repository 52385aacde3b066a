use anyhow::{Context, Result};

use desirepath_store::Store;
use desirepath_types::TurnFilter;

use crate::args::{OutputFormat, TurnsCommand};
use crate::context::AppContext;
use crate::output;
use crate::since::resolve_since;

pub fn run(ctx: &AppContext, command: TurnsCommand) -> Result<()> {
    let store = ctx.open_store()?;

    match command {
        TurnsCommand::List {
            min_length,
            since,
            session,
            pattern,
            limit,
        } => {
            let filter = TurnFilter {
                min_length,
                since: resolve_since(&since)?,
                session,
                pattern,
                limit: Some(limit),
            };
            let turns = store
                .list_turns(&filter, &ctx.cancel)
                .context("listing turns")?;

            match ctx.format {
                OutputFormat::Json => output::print_json(&turns)?,
                OutputFormat::Table => {
                    if turns.is_empty() {
                        println!("No turns recorded.");
                        return Ok(());
                    }
                    let rows: Vec<Vec<String>> = turns
                        .iter()
                        .map(|t| {
                            vec![
                                t.session_id.clone(),
                                t.turn_index.to_string(),
                                t.length.to_string(),
                                output::preview(&t.tools.join(", "), 70),
                            ]
                        })
                        .collect();
                    output::print_table(&["SESSION", "TURN", "LEN", "TOOLS"], &rows);
                }
            }
        }

        TurnsCommand::Patterns { min_length, since } => {
            let since = resolve_since(&since)?;
            let stats = store
                .turn_pattern_stats(min_length, since.as_deref(), &ctx.cancel)
                .context("querying turn patterns")?;

            match ctx.format {
                OutputFormat::Json => output::print_json(&stats)?,
                OutputFormat::Table => {
                    if stats.is_empty() {
                        println!("No turns at or above length {}.", min_length);
                        return Ok(());
                    }
                    let rows: Vec<Vec<String>> = stats
                        .iter()
                        .map(|s| {
                            vec![
                                s.count.to_string(),
                                format!("{:.1}", s.avg_length),
                                s.sessions.to_string(),
                                output::preview(&s.pattern, 70),
                            ]
                        })
                        .collect();
                    output::print_table(&["COUNT", "AVG LEN", "SESSIONS", "PATTERN"], &rows);
                }
            }
        }

        TurnsCommand::Tools { min_length, since } => {
            let since = resolve_since(&since)?;
            let stats = store
                .tool_turn_stats(min_length, since.as_deref(), &ctx.cancel)
                .context("querying tool turn stats")?;

            match ctx.format {
                OutputFormat::Json => output::print_json(&stats)?,
                OutputFormat::Table => {
                    if stats.is_empty() {
                        println!("No turns at or above length {}.", min_length);
                        return Ok(());
                    }
                    let rows: Vec<Vec<String>> = stats
                        .iter()
                        .map(|s| {
                            vec![
                                s.tool_name.clone(),
                                s.occurrences.to_string(),
                                format!("{:.1}", s.avg_turn_length),
                                s.long_turn_occurrences.to_string(),
                                format!("{:.1}%", s.long_turn_pct),
                            ]
                        })
                        .collect();
                    output::print_table(
                        &["TOOL", "CALLS", "AVG TURN", "IN LONG", "LONG %"],
                        &rows,
                    );
                }
            }
        }
    }

    Ok(())
}
