use anyhow::{Context, Result};

use desirepath_store::Store;
use desirepath_types::DesireFilter;

use crate::args::OutputFormat;
use crate::context::AppContext;
use crate::output;
use crate::since::resolve_since;

pub struct ListArgs {
    pub since: Option<String>,
    pub from_source: Option<String>,
    pub tool: Option<String>,
    pub category: Option<String>,
    pub limit: usize,
}

pub fn run(ctx: &AppContext, args: ListArgs) -> Result<()> {
    let filter = DesireFilter {
        since: resolve_since(&args.since)?,
        source: args.from_source,
        tool: args.tool,
        category: args.category,
        limit: Some(args.limit),
    };

    let store = ctx.open_store()?;
    let desires = store
        .list_desires(&filter, &ctx.cancel)
        .context("listing desires")?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&desires)?,
        OutputFormat::Table => {
            if desires.is_empty() {
                println!("No desires recorded.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = desires
                .iter()
                .map(|d| {
                    vec![
                        d.created_at.chars().take(19).collect(),
                        output::preview(&d.tool_name, 28),
                        d.category.clone().unwrap_or_default(),
                        d.source.clone().unwrap_or_default(),
                        output::preview(&d.error, 60),
                    ]
                })
                .collect();
            output::print_table(&["WHEN", "TOOL", "CATEGORY", "SOURCE", "ERROR"], &rows);
        }
    }

    Ok(())
}
