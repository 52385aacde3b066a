mod pattern;
mod time;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub use pattern::*;
pub use time::*;

/// Category tag for desires produced by the Bash failure classifier.
pub const CATEGORY_ENV_NEED: &str = "env-need";

/// Category tag for desires synthesized from recurring turn patterns.
pub const CATEGORY_TURN_PATTERN: &str = "turn-pattern";

/// Source tag attached to desires synthesized by transcript analysis.
pub const SOURCE_TRANSCRIPT_ANALYSIS: &str = "transcript-analysis";

/// Generate a fresh opaque identifier for a desire or invocation.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A single failed (or otherwise notable) tool call.
///
/// Immutable once recorded; identifier uniqueness is enforced at insert
/// time. Optional text fields persist as NULL when absent, never as the
/// empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desire {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Option<Value>,
    pub error: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// A single tool call, successful or not, with turn coordinates.
///
/// `turn_id` conventionally reads `"<session>:<index>"`; `turn_sequence`
/// is the zero-based position within the turn and `turn_length` the total
/// tool steps of the owning turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub host_id: Option<String>,
    pub tool_name: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub turn_id: Option<String>,
    #[serde(default)]
    pub turn_sequence: i64,
    #[serde(default)]
    pub turn_length: i64,
}

/// A correction directive keyed by `(from, tool, param, command, match_kind)`.
///
/// The empty string is a legitimate key component and disambiguates rule
/// kinds: all-empty tail = tool-name alias; non-empty `tool` = parameter
/// rule; non-empty `command` = command rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub from: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub param: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub match_kind: String,
    pub to: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: String,
}

impl AliasRule {
    /// A plain tool-name alias: every other key component empty.
    pub fn name_alias(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            tool: String::new(),
            param: String::new(),
            command: String::new(),
            match_kind: String::new(),
            to: to.into(),
            message: String::new(),
            created_at: String::new(),
        }
    }

    /// True when this row maps a hallucinated tool name to a canonical one.
    pub fn is_name_alias(&self) -> bool {
        self.tool.is_empty()
            && self.param.is_empty()
            && self.command.is_empty()
            && self.match_kind.is_empty()
    }
}

/// Composite lookup key for the alias table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AliasKey {
    pub from: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub param: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub match_kind: String,
}

impl AliasKey {
    pub fn name_only(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Default::default()
        }
    }
}

/// Filter for listing desires. All fields optional; results are newest-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesireFilter {
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Filter for listing invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationFilter {
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub errors_only: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Filter for turn queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnFilter {
    #[serde(default)]
    pub min_length: Option<i64>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One frequency-path entry: a desired tool name, how often it was wanted,
/// and the alias target if an operator already installed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    pub tool_name: String,
    pub count: i64,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub alias_to: Option<String>,
}

/// Detail view for a single path (`inspect`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathDetail {
    pub pattern: String,
    pub total: i64,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    /// Per-day histogram: (YYYY-MM-DD, count), ascending by day.
    #[serde(default)]
    pub per_day: Vec<(String, i64)>,
    #[serde(default)]
    pub top_inputs: Vec<(String, i64)>,
    #[serde(default)]
    pub top_errors: Vec<(String, i64)>,
    #[serde(default)]
    pub alias_to: Option<String>,
}

/// Aggregate desire statistics with sliding windows against the current
/// UTC wall clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesireStats {
    pub total: i64,
    pub unique_tools: i64,
    #[serde(default)]
    pub top_sources: HashMap<String, i64>,
    #[serde(default)]
    pub top_tools: Vec<(String, i64)>,
    #[serde(default)]
    pub earliest: Option<String>,
    #[serde(default)]
    pub latest: Option<String>,
    pub last_24h: i64,
    pub last_7d: i64,
    pub last_30d: i64,
}

/// Aggregate invocation statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationStats {
    pub total: i64,
    pub unique_tools: i64,
    #[serde(default)]
    pub top_tools: Vec<(String, i64)>,
    #[serde(default)]
    pub top_sources: HashMap<String, i64>,
    #[serde(default)]
    pub earliest: Option<String>,
    #[serde(default)]
    pub latest: Option<String>,
    pub last_24h: i64,
    pub last_7d: i64,
    pub last_30d: i64,
}

/// A reconstructed turn: invocations grouped by turn identifier, tool
/// names in `turn_sequence` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRow {
    pub turn_id: String,
    pub session_id: String,
    pub turn_index: i64,
    pub length: i64,
    pub tools: Vec<String>,
}

/// Aggregate row for one canonical turn pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnPatternStat {
    pub pattern: String,
    pub count: i64,
    pub avg_length: f64,
    pub sessions: i64,
}

/// Per-tool turn statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolTurnStat {
    pub tool_name: String,
    pub occurrences: i64,
    pub avg_turn_length: f64,
    pub long_turn_occurrences: i64,
    /// Share of occurrences falling in turns at or above the min-length
    /// threshold, as a percentage rounded to one decimal.
    pub long_turn_pct: f64,
}

impl TurnRow {
    /// Split a `"<session>:<index>"` turn identifier. Splits on the last
    /// colon so session identifiers containing colons survive.
    pub fn split_turn_id(turn_id: &str) -> (String, i64) {
        match turn_id.rsplit_once(':') {
            Some((session, index)) => {
                let idx = index.parse().unwrap_or(0);
                (session.to_string(), idx)
            }
            None => (turn_id.to_string(), 0),
        }
    }
}
