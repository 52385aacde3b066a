use anyhow::{Context, Result};

use desirepath_store::Store;
use desirepath_types::{AliasKey, AliasRule, now_timestamp};

use crate::args::{AliasCommand, OutputFormat};
use crate::context::AppContext;
use crate::output;

pub fn run(ctx: &AppContext, command: AliasCommand) -> Result<()> {
    let store = ctx.open_store()?;

    match command {
        AliasCommand::Set {
            from,
            to,
            tool,
            param,
            command,
            match_kind,
            message,
        } => {
            let alias = AliasRule {
                from: from.clone(),
                tool,
                param,
                command,
                match_kind,
                to: to.clone(),
                message,
                created_at: now_timestamp(),
            };
            store.set_alias(&alias, &ctx.cancel).context("setting alias")?;
            match ctx.format {
                OutputFormat::Json => output::print_json(&alias)?,
                OutputFormat::Table => println!("Installed correction: {} -> {}", from, to),
            }
        }

        AliasCommand::Get {
            from,
            tool,
            param,
            command,
            match_kind,
        } => {
            let key = AliasKey {
                from: from.clone(),
                tool,
                param,
                command,
                match_kind,
            };
            match store.get_alias(&key, &ctx.cancel).context("getting alias")? {
                Some(alias) => match ctx.format {
                    OutputFormat::Json => output::print_json(&alias)?,
                    OutputFormat::Table => print_alias_rows(&[alias]),
                },
                None => {
                    println!("No correction for '{}'", from);
                }
            }
        }

        AliasCommand::List => {
            let aliases = store.get_aliases(&ctx.cancel).context("listing aliases")?;
            match ctx.format {
                OutputFormat::Json => output::print_json(&aliases)?,
                OutputFormat::Table => {
                    if aliases.is_empty() {
                        println!("No corrections installed.");
                    } else {
                        print_alias_rows(&aliases);
                    }
                }
            }
        }

        AliasCommand::Delete {
            from,
            tool,
            param,
            command,
            match_kind,
        } => {
            let key = AliasKey {
                from: from.clone(),
                tool,
                param,
                command,
                match_kind,
            };
            let existed = store.delete_alias(&key, &ctx.cancel).context("deleting alias")?;
            if existed {
                println!("Removed correction for '{}'", from);
            } else {
                println!("No correction for '{}'", from);
            }
        }

        AliasCommand::Rules { tool } => {
            let rules = store
                .get_rules_for_tool(&tool, &ctx.cancel)
                .with_context(|| format!("listing rules for '{}'", tool))?;
            match ctx.format {
                OutputFormat::Json => output::print_json(&rules)?,
                OutputFormat::Table => {
                    if rules.is_empty() {
                        println!("No rules for '{}'", tool);
                    } else {
                        print_alias_rows(&rules);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_alias_rows(aliases: &[AliasRule]) {
    let rows: Vec<Vec<String>> = aliases
        .iter()
        .map(|a| {
            vec![
                a.from.clone(),
                a.to.clone(),
                a.tool.clone(),
                a.param.clone(),
                a.command.clone(),
                a.match_kind.clone(),
                output::preview(&a.message, 40),
            ]
        })
        .collect();
    output::print_table(
        &["FROM", "TO", "TOOL", "PARAM", "COMMAND", "KIND", "MESSAGE"],
        &rows,
    );
}
