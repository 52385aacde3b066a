use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::*;

/// One tool step of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolStep {
    pub tool_name: String,
    pub tool_use_id: String,
    /// Zero-based position within the owning turn.
    pub sequence: usize,
    /// True when two or more tool uses shared the same parent message.
    pub parallel: bool,
    pub is_error: bool,
    pub input: Option<Value>,
    pub error_text: Option<String>,
    /// Timestamp of the assistant message that issued the call.
    pub timestamp: Option<String>,
}

/// One user → assistant exchange with its tool steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscriptTurn {
    pub index: usize,
    pub user_text: Option<String>,
    pub started_at: Option<String>,
    /// Zero when the stream carries no turn-duration annotation.
    pub duration_ms: u64,
    pub steps: Vec<ToolStep>,
}

/// A fully parsed session transcript.
#[derive(Debug, Clone, Default)]
pub struct SessionTranscript {
    pub session_id: Option<String>,
    pub turns: Vec<TranscriptTurn>,
}

/// Parse a line-delimited transcript stream. Blank lines are skipped;
/// malformed JSON aborts with the offending line number.
pub fn parse_transcript(text: &str) -> Result<SessionTranscript> {
    let mut builder = TranscriptBuilder::default();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: SessionRecord =
            serde_json::from_str(line).map_err(|source| Error::Json {
                line: line_no + 1,
                source,
            })?;
        builder.add_record(record);
    }

    Ok(builder.finish())
}

/// Parse a transcript file from disk.
pub fn parse_transcript_file(path: &Path) -> Result<SessionTranscript> {
    let text = std::fs::read_to_string(path)?;
    parse_transcript(&text)
}

#[derive(Default)]
struct TranscriptBuilder {
    session_id: Option<String>,
    turns: Vec<TranscriptTurn>,
    /// tool_use_id -> (turn index, step index), awaiting a result
    pending: HashMap<String, (usize, usize)>,
    /// parent message id of each step, for the parallelism pass
    step_parents: Vec<(usize, usize, String)>,
}

impl TranscriptBuilder {
    fn add_record(&mut self, record: SessionRecord) {
        match record {
            SessionRecord::User(user) => self.add_user(user),
            SessionRecord::Assistant(assistant) => self.add_assistant(assistant),
            SessionRecord::System(system) => self.add_system(system),
            // Snapshots, progress markers and unknown record types are
            // not transcript events
            SessionRecord::FileHistorySnapshot(_)
            | SessionRecord::Progress(_)
            | SessionRecord::Unknown => {}
        }
    }

    fn add_user(&mut self, user: UserRecord) {
        if self.session_id.is_none() {
            self.session_id = user.session_id.clone();
        }
        if user.is_sidechain {
            return;
        }

        let mut carried_results = false;
        for content in &user.message.content {
            if let UserContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } = content
            {
                carried_results = true;
                self.resolve_result(tool_use_id, *is_error, content.as_ref());
            }
        }

        // Tool-result carriers continue the assistant's activity; only a
        // genuine user message starts a new turn.
        if carried_results || user.is_meta {
            return;
        }

        let user_text = user.message.content.iter().find_map(|c| match c {
            UserContent::Text { text } => Some(text.clone()),
            _ => None,
        });

        self.turns.push(TranscriptTurn {
            index: self.turns.len(),
            user_text,
            started_at: user.timestamp,
            duration_ms: 0,
            steps: Vec::new(),
        });
    }

    fn add_assistant(&mut self, assistant: AssistantRecord) {
        if self.session_id.is_none() {
            self.session_id = assistant.session_id.clone();
        }
        if assistant.is_sidechain {
            return;
        }

        let parent_id = assistant.message.id.clone().unwrap_or_default();
        for content in assistant.message.content {
            if let AssistantContent::ToolUse { id, name, input } = content {
                self.add_step(id, name, input, parent_id.clone(), assistant.timestamp.clone());
            }
        }
    }

    fn add_step(
        &mut self,
        tool_use_id: String,
        name: String,
        input: Value,
        parent_id: String,
        timestamp: Option<String>,
    ) {
        // Tool activity before any user message still belongs to a turn
        if self.turns.is_empty() {
            self.turns.push(TranscriptTurn {
                index: 0,
                ..Default::default()
            });
        }

        let turn_idx = self.turns.len() - 1;
        let turn = &mut self.turns[turn_idx];
        let step_idx = turn.steps.len();

        turn.steps.push(ToolStep {
            tool_name: name,
            tool_use_id: tool_use_id.clone(),
            sequence: step_idx,
            parallel: false,
            is_error: false,
            input: if input.is_null() { None } else { Some(input) },
            error_text: None,
            timestamp,
        });

        self.pending.insert(tool_use_id, (turn_idx, step_idx));
        self.step_parents.push((turn_idx, step_idx, parent_id));
    }

    fn resolve_result(&mut self, tool_use_id: &str, is_error: bool, content: Option<&Value>) {
        let Some(&(turn_idx, step_idx)) = self.pending.get(tool_use_id) else {
            return;
        };
        let step = &mut self.turns[turn_idx].steps[step_idx];
        step.is_error = is_error;
        if is_error {
            step.error_text = content.and_then(|v| v.as_str()).map(String::from);
        }
        self.pending.remove(tool_use_id);
    }

    fn add_system(&mut self, system: SystemRecord) {
        if system.subtype == "turn_duration"
            && let Some(duration) = system.duration_ms
            && let Some(turn) = self.turns.last_mut()
        {
            turn.duration_ms = duration;
        }
    }

    fn finish(mut self) -> SessionTranscript {
        // Mark steps parallel where two or more tool uses shared a parent
        // message
        let mut parent_counts: HashMap<(usize, String), usize> = HashMap::new();
        for (turn_idx, _, parent) in &self.step_parents {
            if parent.is_empty() {
                continue;
            }
            *parent_counts
                .entry((*turn_idx, parent.clone()))
                .or_default() += 1;
        }
        for (turn_idx, step_idx, parent) in &self.step_parents {
            if parent.is_empty() {
                continue;
            }
            if parent_counts[&(*turn_idx, parent.clone())] >= 2 {
                self.turns[*turn_idx].steps[*step_idx].parallel = true;
            }
        }

        SessionTranscript {
            session_id: self.session_id,
            turns: self.turns,
        }
    }
}
