use anyhow::Result;
use serde_json::{Value, json};
use std::io::Read;

use desirepath_analysis::{categorize, extract_command};
use desirepath_store::Store;
use desirepath_types::{AliasKey, Desire, Invocation, new_id, now_timestamp};

use crate::context::AppContext;

/// PostToolUse ingest. Records an invocation for every call and a desire
/// for every failed one. This path must never propagate a failure back
/// to the hosting assistant: problems go to stderr and the exit code
/// stays zero.
pub fn ingest(ctx: &AppContext) -> Result<()> {
    if let Err(err) = try_ingest(ctx) {
        eprintln!("desirepath hook: {:#}", err);
    }
    Ok(())
}

fn try_ingest(ctx: &AppContext) -> Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    // Malformed payloads are dropped, not reported: the assistant's own
    // call must not be disturbed by observation
    let Ok(payload) = serde_json::from_str::<Value>(&input) else {
        return Ok(());
    };
    let Some(tool_name) = payload.get("tool_name").and_then(Value::as_str) else {
        return Ok(());
    };

    let tool_input = payload.get("tool_input").cloned().filter(|v| !v.is_null());
    let cwd = payload
        .get("cwd")
        .and_then(Value::as_str)
        .map(String::from);
    let instance_id = payload
        .get("session_id")
        .and_then(Value::as_str)
        .map(String::from);

    let response = payload.get("tool_response");
    let is_error = response_is_error(response);
    let error_text = response.and_then(extract_error_message);

    let store = ctx.open_store()?;
    store.record_invocation(
        &Invocation {
            id: new_id(),
            source: Some(ctx.source.clone()),
            instance_id: instance_id.clone(),
            host_id: None,
            tool_name: tool_name.to_string(),
            is_error,
            error: error_text.clone(),
            cwd: cwd.clone(),
            created_at: now_timestamp(),
            metadata: None,
            turn_id: None,
            turn_sequence: 0,
            turn_length: 0,
        },
        &ctx.cancel,
    )?;

    if !is_error {
        return Ok(());
    }

    let error = error_text.unwrap_or_else(|| "unknown error".to_string());
    let category = categorize(tool_name, &error);
    let metadata = if category.is_empty() {
        None
    } else {
        extract_command(&error, tool_input.as_ref())
            .map(|command| json!({ "missing_command": command }))
    };

    store.record_desire(
        &Desire {
            id: new_id(),
            tool_name: tool_name.to_string(),
            tool_input,
            error,
            category: (!category.is_empty()).then(|| category.to_string()),
            source: Some(ctx.source.clone()),
            instance_id,
            cwd,
            created_at: now_timestamp(),
            metadata,
        },
        &ctx.cancel,
    )?;

    Ok(())
}

fn response_is_error(response: Option<&Value>) -> bool {
    let Some(response) = response else {
        return false;
    };
    if response
        .get("is_error")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return true;
    }
    response
        .get("success")
        .and_then(Value::as_bool)
        .map(|success| !success)
        .unwrap_or(false)
}

fn extract_error_message(response: &Value) -> Option<String> {
    if let Some(error) = response.get("error").and_then(Value::as_str) {
        return Some(error.to_string());
    }
    if let Some(content) = response.get("content").and_then(Value::as_str) {
        return Some(content.to_string());
    }
    response.as_str().map(String::from)
}

/// PreToolUse gate. Exit 0 allows the call; exit 2 blocks it with a
/// redirect message on stderr. Every internal failure fails open.
pub fn gate(ctx: &AppContext) -> Result<()> {
    std::process::exit(gate_exit_code(ctx));
}

fn gate_exit_code(ctx: &AppContext) -> i32 {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        return 0;
    }
    let Ok(payload) = serde_json::from_str::<Value>(&input) else {
        return 0;
    };
    let Some(tool_name) = payload.get("tool_name").and_then(Value::as_str) else {
        return 0;
    };

    let Ok(store) = ctx.open_store() else {
        return 0;
    };
    match store.get_alias(&AliasKey::name_only(tool_name), &ctx.cancel) {
        Ok(Some(alias)) => {
            if alias.message.is_empty() {
                eprintln!(
                    "desirepath: tool '{}' is not available. Use '{}' instead.",
                    alias.from, alias.to
                );
            } else {
                eprintln!(
                    "desirepath: {} ('{}' -> '{}')",
                    alias.message, alias.from, alias.to
                );
            }
            2
        }
        // Absent alias or a store failure both allow the call
        _ => 0,
    }
}
