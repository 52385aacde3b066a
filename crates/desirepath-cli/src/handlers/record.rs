use anyhow::{Context, Result};

use desirepath_analysis::categorize;
use desirepath_store::Store;
use desirepath_types::{Desire, new_id, now_timestamp};

use crate::args::OutputFormat;
use crate::context::AppContext;
use crate::output;

pub struct RecordArgs {
    pub tool: String,
    pub error: String,
    pub input: Option<String>,
    pub category: Option<String>,
    pub cwd: Option<String>,
    pub instance: Option<String>,
}

pub fn run(ctx: &AppContext, args: RecordArgs) -> Result<()> {
    let tool_input = args
        .input
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("parsing --input as JSON")?;

    // Auto-classify when the caller gave no category
    let category = match args.category {
        Some(category) => Some(category),
        None => {
            let tag = categorize(&args.tool, &args.error);
            (!tag.is_empty()).then(|| tag.to_string())
        }
    };

    let desire = Desire {
        id: new_id(),
        tool_name: args.tool,
        tool_input,
        error: args.error,
        category,
        source: Some(ctx.source.clone()),
        instance_id: args.instance,
        cwd: args.cwd,
        created_at: now_timestamp(),
        metadata: None,
    };

    let store = ctx.open_store()?;
    store
        .record_desire(&desire, &ctx.cancel)
        .context("recording desire")?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&desire)?,
        OutputFormat::Table => println!("Recorded desire {} for '{}'", desire.id, desire.tool_name),
    }

    Ok(())
}
