mod args;
mod config;
mod context;
mod handlers;
mod output;
mod since;

pub use args::Cli;

use anyhow::Result;
use args::{AnalyzeCommand, Commands, HookCommand};
use context::AppContext;
use handlers::record::RecordArgs;

pub fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::from_cli(&cli)?;

    match cli.command {
        Commands::Init => handlers::init::run(&ctx),

        Commands::Record {
            tool,
            error,
            input,
            category,
            cwd,
            instance,
        } => handlers::record::run(
            &ctx,
            RecordArgs {
                tool,
                error,
                input,
                category,
                cwd,
                instance,
            },
        ),

        Commands::List {
            since,
            from_source,
            tool,
            category,
            limit,
        } => handlers::list::run(
            &ctx,
            handlers::list::ListArgs {
                since,
                from_source,
                tool,
                category,
                limit,
            },
        ),

        Commands::Paths { since, top } => handlers::paths::run(&ctx, since, top),

        Commands::Inspect {
            pattern,
            since,
            top,
        } => handlers::inspect::run(&ctx, pattern, since, top),

        Commands::Stats => handlers::stats::run(&ctx),

        Commands::Suggest {
            name,
            threshold,
            limit,
        } => handlers::suggest::run(&ctx, name, threshold, limit),

        Commands::Alias { command } => handlers::alias::run(&ctx, command),

        Commands::Correct { command } => handlers::correct::run(&ctx, command),

        Commands::Hook { command } => match command {
            HookCommand::Ingest => handlers::hook::ingest(&ctx),
            HookCommand::Gate => handlers::hook::gate(&ctx),
        },

        Commands::Invocations { command } => handlers::invocations::run(&ctx, command),

        Commands::Turns { command } => handlers::turns::run(&ctx, command),

        Commands::Analyze { command } => match command {
            AnalyzeCommand::Transcript { path } => handlers::analyze::transcript(&ctx, path),
            AnalyzeCommand::Surface { min_length } => handlers::analyze::surface(&ctx, min_length),
        },

        Commands::Export {
            output,
            file_format,
            since,
        } => handlers::export::run(&ctx, output, file_format, since),
    }
}
