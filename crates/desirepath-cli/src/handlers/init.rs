use anyhow::Result;

use crate::config::Config;
use crate::context::AppContext;

/// Create the config file (if absent) and the database, and print where
/// both live.
pub fn run(ctx: &AppContext) -> Result<()> {
    let config_path = Config::path()?;
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        ctx.config.write(&config_path)?;
        println!("Created config at {}", config_path.display());
    }

    // Opening the store creates the database file and applies migrations
    let _store = ctx.open_store()?;
    let db_path = ctx.config.database_path()?;
    println!("Database ready at {}", db_path.display());
    println!();
    println!("Wire the hooks into your assistant settings:");
    println!("  PostToolUse: desirepath hook ingest");
    println!("  PreToolUse:  desirepath hook gate");

    Ok(())
}
