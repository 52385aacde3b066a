use anyhow::{Context, Result};

use desirepath_shell::{Segment, apply_to_full, correct_flag, replace_command, replace_literal};
use desirepath_store::{CancelToken, Store};
use desirepath_types::AliasRule;

use crate::context::AppContext;

/// Apply installed command-correction rules to a shell command string and
/// print the corrected command. Segments are rewritten independently and
/// spliced back at their original offsets; a command with no matching
/// rules passes through unchanged.
pub fn run(ctx: &AppContext, command: String) -> Result<()> {
    let store = ctx.open_store()?;
    let corrected = correct_command(store.as_ref(), &command, &ctx.cancel)?;
    println!("{}", corrected);
    Ok(())
}

pub fn correct_command(
    store: &dyn Store,
    command: &str,
    cancel: &CancelToken,
) -> Result<String> {
    // Command rules are scoped under the Bash tool; each rule's `command`
    // component names the shell command it rewrites
    let rules: Vec<AliasRule> = store
        .get_rules_for_tool("Bash", cancel)
        .context("loading command rules")?
        .into_iter()
        .filter(|rule| !rule.command.is_empty())
        .collect();

    let segments = desirepath_shell::parse_command(command);
    let mut result = command.to_string();

    // Right-to-left so earlier segment offsets stay valid after a splice
    for segment in segments.iter().rev() {
        if let Some(rewritten) = apply_rules(segment, &rules) {
            result = apply_to_full(&result, segment, &rewritten.raw);
        }
    }

    Ok(result)
}

/// First matching rule wins; `match_kind` selects the rewrite operation.
fn apply_rules(segment: &Segment, rules: &[AliasRule]) -> Option<Segment> {
    for rule in rules {
        if rule.command != segment.command {
            continue;
        }
        let rewritten = match rule.match_kind.as_str() {
            "flag" => correct_flag(segment, &rule.from, &rule.to),
            "literal" => replace_literal(segment, &rule.from, &rule.to),
            "command" => Some(replace_command(segment, &rule.to)),
            _ => None,
        };
        if rewritten.is_some() {
            return rewritten;
        }
    }
    None
}
