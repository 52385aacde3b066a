use anyhow::{Context, Result};

use desirepath_store::Store;

use crate::args::OutputFormat;
use crate::context::AppContext;
use crate::output;
use crate::since::resolve_since;

pub fn run(ctx: &AppContext, since: Option<String>, top: usize) -> Result<()> {
    let since = resolve_since(&since)?;
    let store = ctx.open_store()?;
    let paths = store
        .get_paths(since.as_deref(), top, &ctx.cancel)
        .context("querying paths")?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&paths)?,
        OutputFormat::Table => {
            if paths.is_empty() {
                println!("No desires recorded.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = paths
                .iter()
                .map(|p| {
                    vec![
                        p.count.to_string(),
                        output::preview(&p.tool_name, 40),
                        p.alias_to.clone().unwrap_or_default(),
                        p.last_seen
                            .as_deref()
                            .map(|ts| ts.chars().take(19).collect())
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            output::print_table(&["COUNT", "TOOL", "ALIAS", "LAST SEEN"], &rows);
        }
    }

    Ok(())
}
