use anyhow::{Context, Result};

use desirepath_store::Store;

use crate::args::OutputFormat;
use crate::context::AppContext;
use crate::output;

pub fn run(ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store()?;
    let stats = store.stats(&ctx.cancel).context("querying stats")?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&stats)?,
        OutputFormat::Table => {
            println!("Desires:      {}", stats.total);
            println!("Unique tools: {}", stats.unique_tools);
            println!("Last 24h:     {}", stats.last_24h);
            println!("Last 7d:      {}", stats.last_7d);
            println!("Last 30d:     {}", stats.last_30d);
            if let Some(earliest) = &stats.earliest {
                println!("Earliest:     {}", earliest);
            }
            if let Some(latest) = &stats.latest {
                println!("Latest:       {}", latest);
            }

            if !stats.top_tools.is_empty() {
                println!();
                println!("Top tools:");
                for (tool, count) in &stats.top_tools {
                    println!("  {:>4}x  {}", count, tool);
                }
            }
            if !stats.top_sources.is_empty() {
                println!();
                println!("Sources:");
                let mut sources: Vec<_> = stats.top_sources.iter().collect();
                sources.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
                for (source, count) in sources {
                    println!("  {:>4}x  {}", count, source);
                }
            }
        }
    }

    Ok(())
}
