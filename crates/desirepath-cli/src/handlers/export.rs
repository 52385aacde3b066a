use anyhow::{Context, Result};
use std::path::PathBuf;

use desirepath_store::Store;
use desirepath_types::DesireFilter;

use crate::args::ExportFormat;
use crate::context::AppContext;
use crate::since::resolve_since;

pub fn run(
    ctx: &AppContext,
    output: PathBuf,
    format: ExportFormat,
    since: Option<String>,
) -> Result<()> {
    let filter = DesireFilter {
        since: resolve_since(&since)?,
        ..Default::default()
    };

    let store = ctx.open_store()?;
    let desires = store
        .list_desires(&filter, &ctx.cancel)
        .context("listing desires")?;

    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_path(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            writer.write_record([
                "id",
                "tool_name",
                "category",
                "source",
                "instance_id",
                "cwd",
                "created_at",
                "error",
            ])?;
            for desire in &desires {
                writer.write_record([
                    desire.id.as_str(),
                    desire.tool_name.as_str(),
                    desire.category.as_deref().unwrap_or(""),
                    desire.source.as_deref().unwrap_or(""),
                    desire.instance_id.as_deref().unwrap_or(""),
                    desire.cwd.as_deref().unwrap_or(""),
                    desire.created_at.as_str(),
                    desire.error.as_str(),
                ])?;
            }
            writer.flush()?;
        }
        ExportFormat::Json => {
            let content = serde_json::to_string_pretty(&desires)?;
            std::fs::write(&output, content)
                .with_context(|| format!("writing {}", output.display()))?;
        }
    }

    println!("Exported {} desires to {}", desires.len(), output.display());
    Ok(())
}
