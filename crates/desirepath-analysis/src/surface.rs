use serde_json::json;
use std::collections::HashSet;

use desirepath_store::{CancelToken, Result, Store};
use desirepath_types::{
    CATEGORY_TURN_PATTERN, Desire, DesireFilter, SOURCE_TRANSCRIPT_ANALYSIS, new_id,
    now_timestamp, pattern_first_tool,
};

/// Patterns seen in fewer distinct sessions than this stay unreported.
pub const SESSION_THRESHOLD: i64 = 3;

/// Promote recurring turn patterns into desire records.
///
/// Idempotent within a call (each promoted pattern joins the seen set)
/// and across calls (already-recorded patterns are loaded from existing
/// turn-pattern desires before anything is written). Returns the desires
/// created by this run.
pub fn surface_turn_patterns(
    store: &dyn Store,
    min_turn_length: i64,
    cancel: &CancelToken,
) -> Result<Vec<Desire>> {
    let stats = store.turn_pattern_stats(min_turn_length, None, cancel)?;

    let existing = store.list_desires(
        &DesireFilter {
            category: Some(CATEGORY_TURN_PATTERN.to_string()),
            ..Default::default()
        },
        cancel,
    )?;
    let mut seen: HashSet<String> = existing
        .iter()
        .filter_map(|desire| {
            desire
                .metadata
                .as_ref()?
                .get("pattern")?
                .as_str()
                .map(String::from)
        })
        .collect();

    let mut created = Vec::new();
    for stat in stats {
        if stat.sessions < SESSION_THRESHOLD || seen.contains(&stat.pattern) {
            continue;
        }

        let desire = Desire {
            id: new_id(),
            tool_name: pattern_first_tool(&stat.pattern),
            tool_input: None,
            error: format!(
                "Repeated pattern: {} (avg {:.1} calls, seen {} times across {} sessions)",
                stat.pattern, stat.avg_length, stat.count, stat.sessions
            ),
            category: Some(CATEGORY_TURN_PATTERN.to_string()),
            source: Some(SOURCE_TRANSCRIPT_ANALYSIS.to_string()),
            instance_id: None,
            cwd: None,
            created_at: now_timestamp(),
            metadata: Some(json!({
                "pattern": stat.pattern,
                "count": stat.count,
                "avg_length": stat.avg_length,
                "sessions": stat.sessions,
            })),
        };

        store.record_desire(&desire, cancel)?;
        seen.insert(stat.pattern.clone());
        created.push(desire);
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use desirepath_store::LocalStore;
    use desirepath_types::Invocation;

    fn seed_session(store: &LocalStore, session: &str, tools: &[&str]) {
        for (seq, tool) in tools.iter().enumerate() {
            store
                .record_invocation(
                    &Invocation {
                        id: format!("{}-{}", session, seq),
                        source: Some("claude-code".to_string()),
                        instance_id: Some(session.to_string()),
                        host_id: None,
                        tool_name: tool.to_string(),
                        is_error: false,
                        error: None,
                        cwd: None,
                        created_at: now_timestamp(),
                        metadata: None,
                        turn_id: Some(format!("{}:0", session)),
                        turn_sequence: seq as i64,
                        turn_length: tools.len() as i64,
                    },
                    &CancelToken::new(),
                )
                .unwrap();
        }
    }

    #[test]
    fn test_recurring_pattern_is_promoted_once() {
        let store = LocalStore::open_in_memory().unwrap();
        let cancel = CancelToken::new();
        let sequence = ["Grep", "Read", "Read", "Read", "Edit"];
        for session in ["session-a", "session-b", "session-c"] {
            seed_session(&store, session, &sequence);
        }

        let created = surface_turn_patterns(&store, 5, &cancel).unwrap();
        assert_eq!(created.len(), 1);

        let desire = &created[0];
        assert_eq!(desire.tool_name, "Grep");
        assert_eq!(desire.category.as_deref(), Some("turn-pattern"));
        assert_eq!(desire.source.as_deref(), Some("transcript-analysis"));
        assert_eq!(
            desire.error,
            "Repeated pattern: Grep → Read{3+} → Edit (avg 5.0 calls, seen 3 times across 3 sessions)"
        );

        let metadata = desire.metadata.as_ref().unwrap();
        assert_eq!(
            metadata.get("pattern").and_then(|v| v.as_str()),
            Some("Grep → Read{3+} → Edit")
        );
        assert_eq!(metadata.get("count").and_then(|v| v.as_i64()), Some(3));
        assert_eq!(metadata.get("sessions").and_then(|v| v.as_i64()), Some(3));

        // Second run creates nothing: the pattern is already known
        let created_again = surface_turn_patterns(&store, 5, &cancel).unwrap();
        assert!(created_again.is_empty());
        let all = store
            .list_desires(
                &DesireFilter {
                    category: Some(CATEGORY_TURN_PATTERN.to_string()),
                    ..Default::default()
                },
                &cancel,
            )
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_below_session_threshold_is_ignored() {
        let store = LocalStore::open_in_memory().unwrap();
        seed_session(&store, "session-a", &["Grep", "Read", "Read", "Read", "Edit"]);
        seed_session(&store, "session-b", &["Grep", "Read", "Read", "Read", "Edit"]);

        let created = surface_turn_patterns(&store, 5, &CancelToken::new()).unwrap();
        assert!(created.is_empty());
    }

    #[test]
    fn test_min_length_filters_short_turns() {
        let store = LocalStore::open_in_memory().unwrap();
        let cancel = CancelToken::new();
        for session in ["session-a", "session-b", "session-c"] {
            seed_session(&store, session, &["Bash", "Bash"]);
        }

        assert!(surface_turn_patterns(&store, 5, &cancel).unwrap().is_empty());

        let created = surface_turn_patterns(&store, 2, &cancel).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].tool_name, "Bash");
    }

    #[test]
    fn test_fired_token_stops_surfacing_cleanly() {
        let store = LocalStore::open_in_memory().unwrap();
        for session in ["session-a", "session-b", "session-c"] {
            seed_session(&store, session, &["Grep", "Read", "Read", "Read", "Edit"]);
        }

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = surface_turn_patterns(&store, 5, &cancel).unwrap_err();
        assert!(matches!(err, desirepath_store::Error::Cancelled));

        // Nothing was promoted by the cancelled run
        let all = store
            .list_desires(&DesireFilter::default(), &CancelToken::new())
            .unwrap();
        assert!(all.iter().all(|d| d.category.is_none()));
    }
}
