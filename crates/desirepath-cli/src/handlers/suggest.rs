use anyhow::Result;

use desirepath_analysis::suggest;

use crate::args::OutputFormat;
use crate::context::AppContext;
use crate::output;

pub fn run(ctx: &AppContext, name: String, threshold: f64, limit: usize) -> Result<()> {
    let suggestions = suggest(&name, &ctx.config.known_tools, limit, threshold);

    match ctx.format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = suggestions
                .iter()
                .map(|s| serde_json::json!({"name": s.name, "score": s.score}))
                .collect();
            output::print_json(&entries)?;
        }
        OutputFormat::Table => {
            if suggestions.is_empty() {
                println!("No suggestions for '{}'", name);
                return Ok(());
            }
            for suggestion in &suggestions {
                println!("{:.2}  {}", suggestion.score, suggestion.name);
            }
        }
    }

    Ok(())
}
