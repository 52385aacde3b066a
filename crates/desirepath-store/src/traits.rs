use desirepath_types::{
    AliasKey, AliasRule, Desire, DesireFilter, DesireStats, Invocation, InvocationFilter,
    InvocationStats, PathDetail, PathEntry, ToolTurnStat, TurnFilter, TurnPatternStat, TurnRow,
};

use crate::{CancelToken, Result};

/// Capability set shared by the local SQLite store and the remote HTTP
/// store. The analyzer, the correction gate and the CLI depend only on
/// this trait, never on a concrete backend.
///
/// Every entry point takes a [`CancelToken`]. A fired token makes the
/// operation fail with [`Error::Cancelled`](crate::Error::Cancelled);
/// writes roll back their transaction first, so a cancelled call leaves
/// no observable partial effects.
///
/// Releasing the underlying handle is left to `Drop`.
pub trait Store {
    /// Atomic single-row insert; a reused identifier fails with
    /// [`Error::Duplicate`](crate::Error::Duplicate).
    fn record_desire(&self, desire: &Desire, cancel: &CancelToken) -> Result<()>;

    /// Newest-first, totally ordered by timestamp with identifier as the
    /// tiebreaker.
    fn list_desires(&self, filter: &DesireFilter, cancel: &CancelToken) -> Result<Vec<Desire>>;

    /// Frequency paths ranked by count, carrying the alias target when a
    /// tool-name alias is installed for the desired name.
    fn get_paths(
        &self,
        since: Option<&str>,
        top: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<PathEntry>>;

    /// Detail view for one path. A `%` in the pattern switches the match
    /// from exact to LIKE.
    fn inspect_path(
        &self,
        pattern: &str,
        since: Option<&str>,
        top: usize,
        cancel: &CancelToken,
    ) -> Result<PathDetail>;

    fn stats(&self, cancel: &CancelToken) -> Result<DesireStats>;

    /// Upsert on the composite key.
    fn set_alias(&self, alias: &AliasRule, cancel: &CancelToken) -> Result<()>;

    fn get_alias(&self, key: &AliasKey, cancel: &CancelToken) -> Result<Option<AliasRule>>;

    fn get_aliases(&self, cancel: &CancelToken) -> Result<Vec<AliasRule>>;

    /// Returns whether the key existed.
    fn delete_alias(&self, key: &AliasKey, cancel: &CancelToken) -> Result<bool>;

    /// All parameter/command rules scoped to a tool; name-only aliases are
    /// excluded.
    fn get_rules_for_tool(&self, tool: &str, cancel: &CancelToken) -> Result<Vec<AliasRule>>;

    fn record_invocation(&self, invocation: &Invocation, cancel: &CancelToken) -> Result<()>;

    fn list_invocations(
        &self,
        filter: &InvocationFilter,
        cancel: &CancelToken,
    ) -> Result<Vec<Invocation>>;

    fn invocation_stats(&self, cancel: &CancelToken) -> Result<InvocationStats>;

    /// Turns reconstructed from invocations, tool sequences in
    /// `turn_sequence` order, sorted by length descending.
    fn list_turns(&self, filter: &TurnFilter, cancel: &CancelToken) -> Result<Vec<TurnRow>>;

    /// One row per canonical pattern across turns at or above `min_length`.
    fn turn_pattern_stats(
        &self,
        min_length: i64,
        since: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<TurnPatternStat>>;

    /// Per-tool occurrence statistics for tools that appear in at least
    /// one turn at or above `min_length`.
    fn tool_turn_stats(
        &self,
        min_length: i64,
        since: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<ToolTurnStat>>;
}
