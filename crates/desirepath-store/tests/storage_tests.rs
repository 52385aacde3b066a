use desirepath_store::{CancelToken, Error, LocalStore, Store};
use desirepath_types::{
    AliasKey, AliasRule, Desire, DesireFilter, Invocation, InvocationFilter, TurnFilter,
    now_timestamp,
};
use serde_json::json;
use tempfile::TempDir;

fn desire(id: &str, tool: &str, ts: &str) -> Desire {
    Desire {
        id: id.to_string(),
        tool_name: tool.to_string(),
        tool_input: None,
        error: "tool not available".to_string(),
        category: None,
        source: Some("claude-code".to_string()),
        instance_id: None,
        cwd: None,
        created_at: ts.to_string(),
        metadata: None,
    }
}

fn invocation(id: &str, tool: &str, turn_id: &str, seq: i64, len: i64) -> Invocation {
    Invocation {
        id: id.to_string(),
        source: Some("claude-code".to_string()),
        instance_id: Some("instance-1".to_string()),
        host_id: None,
        tool_name: tool.to_string(),
        is_error: false,
        error: None,
        cwd: None,
        created_at: now_timestamp(),
        metadata: None,
        turn_id: Some(turn_id.to_string()),
        turn_sequence: seq,
        turn_length: len,
    }
}

#[test]
fn test_desire_round_trip_all_fields() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::open(&temp_dir.path().join("desires.db")).unwrap();
    let cancel = CancelToken::new();

    let recorded = Desire {
        id: "d-1".to_string(),
        tool_name: "read_file".to_string(),
        tool_input: Some(json!({"path": "/tmp/a.txt", "offset": 12})),
        error: "No such tool available: read_file".to_string(),
        category: Some("env-need".to_string()),
        source: Some("claude-code".to_string()),
        instance_id: Some("sess-42".to_string()),
        cwd: Some("/home/user/project".to_string()),
        created_at: "2025-06-01T10:00:00.123456789Z".to_string(),
        metadata: Some(json!({"attempt": 3, "nested": {"deep": true}})),
    };

    store.record_desire(&recorded, &cancel).unwrap();
    let listed = store.list_desires(&DesireFilter::default(), &cancel).unwrap();
    assert_eq!(listed, vec![recorded]);
}

#[test]
fn test_absent_fields_round_trip_as_absent() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let minimal = desire("d-1", "read_file", &now_timestamp());
    store.record_desire(&minimal, &cancel).unwrap();

    let listed = store.list_desires(&DesireFilter::default(), &cancel).unwrap();
    assert_eq!(listed[0].tool_input, None);
    assert_eq!(listed[0].category, None);
    assert_eq!(listed[0].cwd, None);
    assert_eq!(listed[0].metadata, None);
}

#[test]
fn test_list_desires_newest_first_with_id_tiebreak() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    store
        .record_desire(&desire("a", "one", "2025-06-01T10:00:00.000000001Z"), &cancel)
        .unwrap();
    store
        .record_desire(&desire("c", "two", "2025-06-01T10:00:00.000000002Z"), &cancel)
        .unwrap();
    store
        .record_desire(
            &desire("b", "three", "2025-06-01T10:00:00.000000002Z"),
            &cancel,
        )
        .unwrap();

    let listed = store.list_desires(&DesireFilter::default(), &cancel).unwrap();
    let ids: Vec<&str> = listed.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
}

#[test]
fn test_list_desires_filters() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let mut d1 = desire("d1", "read_file", "2025-06-01T10:00:00.000000000Z");
    d1.category = Some("env-need".to_string());
    let mut d2 = desire("d2", "write_file", "2025-06-02T10:00:00.000000000Z");
    d2.source = Some("other-agent".to_string());
    store.record_desire(&d1, &cancel).unwrap();
    store.record_desire(&d2, &cancel).unwrap();

    let by_tool = store
        .list_desires(
            &DesireFilter {
                tool: Some("read_file".to_string()),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(by_tool.len(), 1);
    assert_eq!(by_tool[0].id, "d1");

    let by_category = store
        .list_desires(
            &DesireFilter {
                category: Some("env-need".to_string()),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(by_category.len(), 1);

    let by_source = store
        .list_desires(
            &DesireFilter {
                source: Some("other-agent".to_string()),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(by_source[0].id, "d2");

    let since = store
        .list_desires(
            &DesireFilter {
                since: Some("2025-06-02T00:00:00.000000000Z".to_string()),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(since.len(), 1);

    let limited = store
        .list_desires(
            &DesireFilter {
                limit: Some(1),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_path_aggregation_with_alias_join() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    for (i, tool) in ["read_file", "read_file", "write_file", "read_file", "run_tests"]
        .iter()
        .enumerate()
    {
        store
            .record_desire(&desire(&format!("d{}", i), tool, &now_timestamp()), &cancel)
            .unwrap();
    }

    let paths = store.get_paths(None, 10, &cancel).unwrap();
    assert_eq!(paths.len(), 3);
    assert_eq!(paths[0].tool_name, "read_file");
    assert_eq!(paths[0].count, 3);
    assert_eq!(paths[0].alias_to, None);
    assert_eq!(paths[1].count, 1);
    assert_eq!(paths[2].count, 1);

    let mut alias = AliasRule::name_alias("read_file", "Read");
    alias.created_at = now_timestamp();
    store.set_alias(&alias, &cancel).unwrap();

    let paths = store.get_paths(None, 10, &cancel).unwrap();
    assert_eq!(paths[0].alias_to, Some("Read".to_string()));
}

#[test]
fn test_inspect_path_exact_and_wildcard() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let mut d1 = desire("d1", "read_file", "2025-06-01T10:00:00.000000000Z");
    d1.tool_input = Some(json!({"path": "a"}));
    let d2 = desire("d2", "read_file", "2025-06-02T11:00:00.000000000Z");
    let d3 = desire("d3", "read_many", "2025-06-02T12:00:00.000000000Z");
    store.record_desire(&d1, &cancel).unwrap();
    store.record_desire(&d2, &cancel).unwrap();
    store.record_desire(&d3, &cancel).unwrap();

    let exact = store.inspect_path("read_file", None, 5, &cancel).unwrap();
    assert_eq!(exact.total, 2);
    assert_eq!(
        exact.first_seen.as_deref(),
        Some("2025-06-01T10:00:00.000000000Z")
    );
    assert_eq!(
        exact.last_seen.as_deref(),
        Some("2025-06-02T11:00:00.000000000Z")
    );
    assert_eq!(
        exact.per_day,
        vec![("2025-06-01".to_string(), 1), ("2025-06-02".to_string(), 1)]
    );
    assert_eq!(exact.top_inputs.len(), 1);
    assert_eq!(exact.top_errors.len(), 1);

    let wildcard = store.inspect_path("read%", None, 5, &cancel).unwrap();
    assert_eq!(wildcard.total, 3);
}

#[test]
fn test_alias_upsert_get_delete() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let mut alias = AliasRule::name_alias("read_file", "Read");
    alias.message = "use Read instead".to_string();
    alias.created_at = now_timestamp();
    store.set_alias(&alias, &cancel).unwrap();

    let key = AliasKey::name_only("read_file");
    let fetched = store.get_alias(&key, &cancel).unwrap().unwrap();
    assert_eq!(fetched.to, "Read");
    assert_eq!(fetched.message, "use Read instead");

    // Upsert on the same composite key overwrites the target
    alias.to = "ReadFile".to_string();
    store.set_alias(&alias, &cancel).unwrap();
    let fetched = store.get_alias(&key, &cancel).unwrap().unwrap();
    assert_eq!(fetched.to, "ReadFile");
    assert_eq!(store.get_aliases(&cancel).unwrap().len(), 1);

    assert!(store.delete_alias(&key, &cancel).unwrap());
    assert!(!store.delete_alias(&key, &cancel).unwrap());
    assert!(store.get_alias(&key, &cancel).unwrap().is_none());
}

#[test]
fn test_name_alias_and_param_rule_coexist() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let mut name_alias = AliasRule::name_alias("read_file", "Read");
    name_alias.created_at = now_timestamp();
    store.set_alias(&name_alias, &cancel).unwrap();

    let param_rule = AliasRule {
        from: "read_file".to_string(),
        tool: "Read".to_string(),
        param: "path".to_string(),
        command: String::new(),
        match_kind: "exact".to_string(),
        to: "file_path".to_string(),
        message: String::new(),
        created_at: now_timestamp(),
    };
    store.set_alias(&param_rule, &cancel).unwrap();

    assert_eq!(store.get_aliases(&cancel).unwrap().len(), 2);

    let rules = store.get_rules_for_tool("Read", &cancel).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].param, "path");

    // Name-only lookup is unaffected by the parameter rule
    let fetched = store
        .get_alias(&AliasKey::name_only("read_file"), &cancel)
        .unwrap()
        .unwrap();
    assert_eq!(fetched.to, "Read");
}

#[test]
fn test_invocation_round_trip_with_turn_coordinates() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let recorded = Invocation {
        id: "i-1".to_string(),
        source: Some("claude-code".to_string()),
        instance_id: Some("sess-1".to_string()),
        host_id: Some("host-a".to_string()),
        tool_name: "Bash".to_string(),
        is_error: true,
        error: Some("command not found".to_string()),
        cwd: Some("/work".to_string()),
        created_at: "2025-06-01T10:00:00.999999999Z".to_string(),
        metadata: Some(json!({"k": "v"})),
        turn_id: Some("sess-1:3".to_string()),
        turn_sequence: 2,
        turn_length: 5,
    };
    store.record_invocation(&recorded, &cancel).unwrap();

    let listed = store
        .list_invocations(&InvocationFilter::default(), &cancel)
        .unwrap();
    assert_eq!(listed, vec![recorded]);

    let err = store.record_invocation(&listed[0], &cancel).unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)));
}

#[test]
fn test_list_invocations_errors_only() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let ok = invocation("i-1", "Read", "s:0", 0, 2);
    let mut failed = invocation("i-2", "Bash", "s:0", 1, 2);
    failed.is_error = true;
    failed.error = Some("boom".to_string());
    store.record_invocation(&ok, &cancel).unwrap();
    store.record_invocation(&failed, &cancel).unwrap();

    let errors = store
        .list_invocations(
            &InvocationFilter {
                errors_only: true,
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].id, "i-2");
}

#[test]
fn test_turn_reconstruction_preserves_sequence_order() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    // Insert out of order; reconstruction must sort by turn_sequence
    store
        .record_invocation(&invocation("i-2", "Read", "sess-a:0", 1, 3), &cancel)
        .unwrap();
    store
        .record_invocation(&invocation("i-3", "Edit", "sess-a:0", 2, 3), &cancel)
        .unwrap();
    store
        .record_invocation(&invocation("i-1", "Grep", "sess-a:0", 0, 3), &cancel)
        .unwrap();

    let turns = store.list_turns(&TurnFilter::default(), &cancel).unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].session_id, "sess-a");
    assert_eq!(turns[0].turn_index, 0);
    assert_eq!(turns[0].length, 3);
    assert_eq!(turns[0].tools, vec!["Grep", "Read", "Edit"]);
}

#[test]
fn test_turn_pattern_and_tool_stats() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    let sequence = ["Grep", "Read", "Read", "Read", "Edit"];
    for session in ["session-a", "session-b", "session-c"] {
        for (seq, tool) in sequence.iter().enumerate() {
            store
                .record_invocation(
                    &invocation(
                        &format!("{}-{}", session, seq),
                        tool,
                        &format!("{}:0", session),
                        seq as i64,
                        sequence.len() as i64,
                    ),
                    &cancel,
                )
                .unwrap();
        }
    }
    // One short turn that must not meet a min-length of 5
    store
        .record_invocation(&invocation("short-0", "Bash", "session-d:0", 0, 1), &cancel)
        .unwrap();

    let patterns = store.turn_pattern_stats(5, None, &cancel).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].pattern, "Grep → Read{3+} → Edit");
    assert_eq!(patterns[0].count, 3);
    assert_eq!(patterns[0].sessions, 3);
    assert!((patterns[0].avg_length - 5.0).abs() < f64::EPSILON);

    let tool_stats = store.tool_turn_stats(5, None, &cancel).unwrap();
    let read = tool_stats
        .iter()
        .find(|s| s.tool_name == "Read")
        .expect("Read stats present");
    assert_eq!(read.occurrences, 9);
    assert_eq!(read.long_turn_occurrences, 9);
    assert!((read.avg_turn_length - 5.0).abs() < f64::EPSILON);
    assert!((read.long_turn_pct - 100.0).abs() < f64::EPSILON);

    // Bash only appears in the short turn and is excluded
    assert!(tool_stats.iter().all(|s| s.tool_name != "Bash"));

    let long_turns = store
        .list_turns(
            &TurnFilter {
                min_length: Some(5),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(long_turns.len(), 3);

    let by_pattern = store
        .list_turns(
            &TurnFilter {
                pattern: Some("Grep → Read{3+} → Edit".to_string()),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(by_pattern.len(), 3);

    let by_session = store
        .list_turns(
            &TurnFilter {
                session: Some("session-b".to_string()),
                ..Default::default()
            },
            &cancel,
        )
        .unwrap();
    assert_eq!(by_session.len(), 1);
}

#[test]
fn test_unicode_and_large_payload_round_trip() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();

    let odd_name = "lire_fichier_日本語_\"quoted\"\ttabbed_🔧".repeat(10);
    assert!(odd_name.len() < 1000);
    let big_input = json!({"command": "x".repeat(100 * 1024)});
    let big_metadata: serde_json::Value = (0..500)
        .map(|i| (format!("key-{}", i), json!(i)))
        .collect::<serde_json::Map<String, serde_json::Value>>()
        .into();

    let mut d = desire("d-big", &odd_name, &now_timestamp());
    d.tool_input = Some(big_input.clone());
    d.error = "e".repeat(100 * 1024);
    d.metadata = Some(big_metadata.clone());
    store.record_desire(&d, &cancel).unwrap();

    let listed = store.list_desires(&DesireFilter::default(), &cancel).unwrap();
    assert_eq!(listed[0].tool_name, odd_name);
    assert_eq!(listed[0].tool_input, Some(big_input));
    assert_eq!(listed[0].metadata, Some(big_metadata));
    assert_eq!(listed[0].error.len(), 100 * 1024);

    let paths = store.get_paths(None, 10, &cancel).unwrap();
    assert_eq!(paths[0].tool_name, odd_name);
}

#[test]
fn test_stats_windows() {
    let store = LocalStore::open_in_memory().unwrap();
    let cancel = CancelToken::new();
    store
        .record_desire(
            &desire("old", "read_file", "2020-01-01T00:00:00.000000000Z"),
            &cancel,
        )
        .unwrap();
    store
        .record_desire(&desire("new", "read_file", &now_timestamp()), &cancel)
        .unwrap();

    let stats = store.stats(&cancel).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.unique_tools, 1);
    assert_eq!(stats.last_24h, 1);
    assert_eq!(stats.last_7d, 1);
    assert_eq!(stats.last_30d, 1);
    assert_eq!(
        stats.earliest.as_deref(),
        Some("2020-01-01T00:00:00.000000000Z")
    );
    assert_eq!(stats.top_sources.get("claude-code"), Some(&2));

    let inv_stats = store.invocation_stats(&cancel).unwrap();
    assert_eq!(inv_stats.total, 0);
}

#[test]
fn test_cancelled_write_is_rolled_back_and_retryable() {
    let store = LocalStore::open_in_memory().unwrap();
    let live = CancelToken::new();

    let fired = CancelToken::new();
    fired.cancel();

    let d = desire("d-1", "read_file", &now_timestamp());
    assert!(matches!(
        store.record_desire(&d, &fired).unwrap_err(),
        Error::Cancelled
    ));
    assert!(
        store
            .list_desires(&DesireFilter::default(), &live)
            .unwrap()
            .is_empty()
    );

    // The identifier is still free: nothing from the cancelled attempt
    // was committed
    store.record_desire(&d, &live).unwrap();
    assert_eq!(
        store
            .list_desires(&DesireFilter::default(), &live)
            .unwrap()
            .len(),
        1
    );

    let alias = AliasRule::name_alias("read_file", "Read");
    assert!(matches!(
        store.set_alias(&alias, &fired).unwrap_err(),
        Error::Cancelled
    ));
    assert!(store.get_aliases(&live).unwrap().is_empty());
}
