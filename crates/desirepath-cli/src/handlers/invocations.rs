use anyhow::{Context, Result};

use desirepath_store::Store;
use desirepath_types::InvocationFilter;

use crate::args::{InvocationsCommand, OutputFormat};
use crate::context::AppContext;
use crate::output;
use crate::since::resolve_since;

pub fn run(ctx: &AppContext, command: InvocationsCommand) -> Result<()> {
    let store = ctx.open_store()?;

    match command {
        InvocationsCommand::List {
            since,
            from_source,
            instance,
            tool,
            errors,
            limit,
        } => {
            let filter = InvocationFilter {
                since: resolve_since(&since)?,
                source: from_source,
                instance,
                tool,
                errors_only: errors,
                limit: Some(limit),
            };
            let invocations = store
                .list_invocations(&filter, &ctx.cancel)
                .context("listing invocations")?;

            match ctx.format {
                OutputFormat::Json => output::print_json(&invocations)?,
                OutputFormat::Table => {
                    if invocations.is_empty() {
                        println!("No invocations recorded.");
                        return Ok(());
                    }
                    let rows: Vec<Vec<String>> = invocations
                        .iter()
                        .map(|i| {
                            vec![
                                i.created_at.chars().take(19).collect(),
                                output::preview(&i.tool_name, 28),
                                if i.is_error { "error" } else { "ok" }.to_string(),
                                i.turn_id.clone().unwrap_or_default(),
                                i.error
                                    .as_deref()
                                    .map(|e| output::preview(e, 50))
                                    .unwrap_or_default(),
                            ]
                        })
                        .collect();
                    output::print_table(&["WHEN", "TOOL", "STATUS", "TURN", "ERROR"], &rows);
                }
            }
        }

        InvocationsCommand::Stats => {
            let stats = store
                .invocation_stats(&ctx.cancel)
                .context("querying invocation stats")?;
            match ctx.format {
                OutputFormat::Json => output::print_json(&stats)?,
                OutputFormat::Table => {
                    println!("Invocations:  {}", stats.total);
                    println!("Unique tools: {}", stats.unique_tools);
                    println!("Last 24h:     {}", stats.last_24h);
                    println!("Last 7d:      {}", stats.last_7d);
                    println!("Last 30d:     {}", stats.last_30d);
                    if !stats.top_tools.is_empty() {
                        println!();
                        println!("Top tools:");
                        for (tool, count) in &stats.top_tools {
                            println!("  {:>4}x  {}", count, tool);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
