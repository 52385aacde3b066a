use anyhow::{Context, Result};

use desirepath_store::Store;

use crate::args::OutputFormat;
use crate::context::AppContext;
use crate::output;
use crate::since::resolve_since;

pub fn run(ctx: &AppContext, pattern: String, since: Option<String>, top: usize) -> Result<()> {
    let since = resolve_since(&since)?;
    let store = ctx.open_store()?;
    let detail = store
        .inspect_path(&pattern, since.as_deref(), top, &ctx.cancel)
        .with_context(|| format!("inspecting path '{}'", pattern))?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&detail)?,
        OutputFormat::Table => {
            println!("Pattern:    {}", detail.pattern);
            println!("Total:      {}", detail.total);
            if let Some(first) = &detail.first_seen {
                println!("First seen: {}", first);
            }
            if let Some(last) = &detail.last_seen {
                println!("Last seen:  {}", last);
            }
            if let Some(alias) = &detail.alias_to {
                println!("Alias:      -> {}", alias);
            }

            if !detail.per_day.is_empty() {
                println!();
                println!("Per day:");
                for (day, count) in &detail.per_day {
                    println!("  {}  {}", day, count);
                }
            }
            if !detail.top_inputs.is_empty() {
                println!();
                println!("Top inputs:");
                for (input, count) in &detail.top_inputs {
                    println!("  {:>4}x  {}", count, output::preview(input, 70));
                }
            }
            if !detail.top_errors.is_empty() {
                println!();
                println!("Top errors:");
                for (error, count) in &detail.top_errors {
                    println!("  {:>4}x  {}", count, output::preview(error, 70));
                }
            }
        }
    }

    Ok(())
}
