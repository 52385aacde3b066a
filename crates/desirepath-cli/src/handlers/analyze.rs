use anyhow::{Context, Result, bail};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use desirepath_analysis::{DEFAULT_THRESHOLD, suggest, surface_turn_patterns};
use desirepath_store::Store;
use desirepath_transcript::parse_transcript_file;
use desirepath_types::{
    Invocation, format_timestamp, new_id, now_timestamp, parse_timestamp,
};

use crate::args::OutputFormat;
use crate::context::AppContext;
use crate::output;

/// Parse one transcript file (or every `.jsonl` under a directory),
/// record each tool step as an invocation with its turn coordinates, and
/// point out failing tool names that look like near-misses of known
/// tools.
pub fn transcript(ctx: &AppContext, path: PathBuf) -> Result<()> {
    let files = collect_transcript_files(&path)?;
    if files.is_empty() {
        bail!("no transcript files found under {}", path.display());
    }

    let store = ctx.open_store()?;
    let mut recorded = 0usize;
    let mut turns_seen = 0usize;
    let mut suggested: HashSet<String> = HashSet::new();

    for file in &files {
        let transcript = parse_transcript_file(file)
            .with_context(|| format!("parsing transcript {}", file.display()))?;

        let session = transcript.session_id.clone().unwrap_or_else(|| {
            file.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        });

        for turn in &transcript.turns {
            if turn.steps.is_empty() {
                continue;
            }
            turns_seen += 1;
            let turn_id = format!("{}:{}", session, turn.index);

            for step in &turn.steps {
                store
                    .record_invocation(
                        &Invocation {
                            id: new_id(),
                            source: Some(ctx.source.clone()),
                            instance_id: Some(session.clone()),
                            host_id: None,
                            tool_name: step.tool_name.clone(),
                            is_error: step.is_error,
                            error: step.error_text.clone(),
                            cwd: None,
                            created_at: normalize_timestamp(step.timestamp.as_deref()),
                            metadata: Some(json!({
                                "tool_use_id": step.tool_use_id,
                                "parallel": step.parallel,
                            })),
                            turn_id: Some(turn_id.clone()),
                            turn_sequence: step.sequence as i64,
                            turn_length: turn.steps.len() as i64,
                        },
                        &ctx.cancel,
                    )
                    .context("recording invocation")?;
                recorded += 1;

                // A failing call to a name we do not know is the classic
                // hallucinated-tool shape; offer the closest real names
                if step.is_error
                    && !ctx.config.known_tools.contains(&step.tool_name)
                    && suggested.insert(step.tool_name.clone())
                {
                    let candidates = suggest(
                        &step.tool_name,
                        &ctx.config.known_tools,
                        3,
                        DEFAULT_THRESHOLD,
                    );
                    if let Some(best) = candidates.first() {
                        println!(
                            "Hint: '{}' failed; closest known tool is '{}' ({:.2}). \
                             Install with: desirepath alias set {} {}",
                            step.tool_name, best.name, best.score, step.tool_name, best.name
                        );
                    }
                }
            }
        }
    }

    println!(
        "Recorded {} invocations across {} turns from {} file(s).",
        recorded,
        turns_seen,
        files.len()
    );
    Ok(())
}

/// Promote recurring turn patterns into desires.
pub fn surface(ctx: &AppContext, min_length: i64) -> Result<()> {
    let store = ctx.open_store()?;
    let created = surface_turn_patterns(store.as_ref(), min_length, &ctx.cancel)
        .context("surfacing turn patterns")?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&created)?,
        OutputFormat::Table => {
            if created.is_empty() {
                println!("No new patterns to surface.");
            } else {
                for desire in &created {
                    println!("{}", desire.error);
                }
                println!("Surfaced {} pattern(s) as desires.", created.len());
            }
        }
    }

    Ok(())
}

fn collect_transcript_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == "jsonl")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn normalize_timestamp(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(format_timestamp)
        .unwrap_or_else(now_timestamp)
}
