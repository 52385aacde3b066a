// NOTE: Command Organization Rationale
//
// Namespaced subcommands (alias, invocations, turns, analyze, hook)
// mirror the data model: flat commands cover the desire stream that
// operators touch daily, namespaces group the rarer management surfaces.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "desirepath")]
#[command(about = "Record and correct the tool calls AI assistants wish they could make", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Database file (defaults to the configured path)")]
    pub db: Option<String>,

    #[arg(long, global = true, help = "Output format")]
    pub format: Option<OutputFormat>,

    #[arg(long, global = true, help = "Source tag recorded with new events")]
    pub source: Option<String>,

    #[arg(long, global = true, help = "Remote store base URL (overrides config)")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    // Core Commands
    #[command(about = "Initialize the config file and database (run once to get started)")]
    Init,

    #[command(about = "Record a desire by hand (mostly for testing hooks and rules)")]
    Record {
        #[arg(help = "Tool name the assistant asked for")]
        tool: String,

        #[arg(help = "Error text the call failed with")]
        error: String,

        #[arg(long, help = "Tool input as a JSON object")]
        input: Option<String>,

        #[arg(long, help = "Category tag (e.g. env-need)")]
        category: Option<String>,

        #[arg(long, help = "Working directory of the call")]
        cwd: Option<String>,

        #[arg(long, help = "Assistant instance identifier")]
        instance: Option<String>,
    },

    #[command(about = "List recorded desires, newest first")]
    List {
        #[arg(long, help = "Only events at or after this time (RFC 3339, or 24h/7d style)")]
        since: Option<String>,

        #[arg(long, help = "Filter by source tag")]
        from_source: Option<String>,

        #[arg(long, help = "Filter by tool name")]
        tool: Option<String>,

        #[arg(long, help = "Filter by category")]
        category: Option<String>,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    #[command(about = "Most-wanted tools ranked by how often they were desired")]
    Paths {
        #[arg(long)]
        since: Option<String>,

        #[arg(long, default_value = "10")]
        top: usize,
    },

    #[command(about = "Inspect one desired tool: history, inputs, errors")]
    Inspect {
        #[arg(help = "Tool name; use % for prefix/infix matching")]
        pattern: String,

        #[arg(long)]
        since: Option<String>,

        #[arg(long, default_value = "5")]
        top: usize,
    },

    #[command(about = "Aggregate desire statistics")]
    Stats,

    #[command(about = "Suggest canonical tools for a hallucinated name")]
    Suggest {
        name: String,

        #[arg(long, default_value = "0.5")]
        threshold: f64,

        #[arg(long, default_value = "3")]
        limit: usize,
    },

    // Correction Management
    #[command(
        next_help_heading = "Correction Management",
        about = "Manage name aliases and parameter/command rules"
    )]
    Alias {
        #[command(subcommand)]
        command: AliasCommand,
    },

    #[command(about = "Apply installed command rules to a shell command")]
    Correct {
        #[arg(help = "Shell command string to correct")]
        command: String,
    },

    #[command(about = "Hook entry points wired into the assistant settings")]
    Hook {
        #[command(subcommand)]
        command: HookCommand,
    },

    // Analysis
    #[command(next_help_heading = "Analysis", about = "Query the invocation stream")]
    Invocations {
        #[command(subcommand)]
        command: InvocationsCommand,
    },

    #[command(about = "Query reconstructed turns and their patterns")]
    Turns {
        #[command(subcommand)]
        command: TurnsCommand,
    },

    #[command(about = "Analyze transcripts and surface recurring patterns")]
    Analyze {
        #[command(subcommand)]
        command: AnalyzeCommand,
    },

    #[command(about = "Export desires to CSV or JSON")]
    Export {
        #[arg(long, help = "Destination file")]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "csv", help = "Export file format")]
        file_format: ExportFormat,

        #[arg(long)]
        since: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AliasCommand {
    #[command(about = "Install or update a correction (upsert on the composite key)")]
    Set {
        #[arg(help = "Name the assistant uses")]
        from: String,

        #[arg(help = "Name or value to redirect to")]
        to: String,

        #[arg(long, default_value = "", help = "Tool scope for parameter rules")]
        tool: String,

        #[arg(long, default_value = "", help = "Parameter to rewrite")]
        param: String,

        #[arg(long, default_value = "", help = "Shell command scope for command rules")]
        command: String,

        #[arg(long, default_value = "", help = "Match kind (implementation-defined tag)")]
        match_kind: String,

        #[arg(long, default_value = "", help = "Message shown when the gate redirects")]
        message: String,
    },

    #[command(about = "Look up one correction by its composite key")]
    Get {
        from: String,

        #[arg(long, default_value = "")]
        tool: String,

        #[arg(long, default_value = "")]
        param: String,

        #[arg(long, default_value = "")]
        command: String,

        #[arg(long, default_value = "")]
        match_kind: String,
    },

    #[command(about = "List all corrections")]
    List,

    #[command(about = "Remove a correction; reports whether it existed")]
    Delete {
        from: String,

        #[arg(long, default_value = "")]
        tool: String,

        #[arg(long, default_value = "")]
        param: String,

        #[arg(long, default_value = "")]
        command: String,

        #[arg(long, default_value = "")]
        match_kind: String,
    },

    #[command(about = "List parameter/command rules scoped to a tool")]
    Rules {
        tool: String,
    },
}

#[derive(Subcommand)]
pub enum HookCommand {
    #[command(about = "PostToolUse ingest: record the call, never block the assistant")]
    Ingest,

    #[command(about = "PreToolUse gate: exit 2 with a redirect message when an alias matches")]
    Gate,
}

#[derive(Subcommand)]
pub enum InvocationsCommand {
    #[command(about = "List recorded invocations, newest first")]
    List {
        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        from_source: Option<String>,

        #[arg(long)]
        instance: Option<String>,

        #[arg(long)]
        tool: Option<String>,

        #[arg(long, help = "Only failed invocations")]
        errors: bool,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    #[command(about = "Aggregate invocation statistics")]
    Stats,
}

#[derive(Subcommand)]
pub enum TurnsCommand {
    #[command(about = "List reconstructed turns, longest first")]
    List {
        #[arg(long)]
        min_length: Option<i64>,

        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        session: Option<String>,

        #[arg(long, help = "Canonical pattern to match exactly")]
        pattern: Option<String>,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    #[command(about = "Canonical patterns across long turns")]
    Patterns {
        #[arg(long, default_value = "5")]
        min_length: i64,

        #[arg(long)]
        since: Option<String>,
    },

    #[command(about = "Per-tool statistics over long turns")]
    Tools {
        #[arg(long, default_value = "5")]
        min_length: i64,

        #[arg(long)]
        since: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AnalyzeCommand {
    #[command(about = "Parse transcript files and record their tool calls as invocations")]
    Transcript {
        #[arg(help = "A transcript file or a directory of .jsonl files")]
        path: PathBuf,
    },

    #[command(about = "Promote recurring turn patterns into desires")]
    Surface {
        #[arg(long, default_value = "5")]
        min_length: i64,
    },
}
