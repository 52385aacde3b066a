use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub(crate) enum SessionRecord {
    User(UserRecord),
    Assistant(AssistantRecord),
    System(SystemRecord),
    // File snapshots and progress markers are not part of the transcript
    FileHistorySnapshot(IgnoredRecord),
    Progress(IgnoredRecord),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct IgnoredRecord {}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserRecord {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub message: UserMessage,
    #[serde(default)]
    pub is_meta: bool,
    #[serde(default)]
    pub is_sidechain: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct UserMessage {
    #[serde(default, deserialize_with = "deserialize_user_content")]
    pub content: Vec<UserContent>,
}

/// Claude writes user content either as a bare string or as a block array.
fn deserialize_user_content<'de, D>(deserializer: D) -> Result<Vec<UserContent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrArray {
        String(String),
        Array(Vec<UserContent>),
    }

    match StringOrArray::deserialize(deserializer)? {
        StringOrArray::String(text) => Ok(vec![UserContent::Text { text }]),
        StringOrArray::Array(blocks) => Ok(blocks),
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub(crate) enum UserContent {
    Text {
        text: String,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<Value>,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssistantRecord {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub message: AssistantMessage,
    #[serde(default)]
    pub is_sidechain: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct AssistantMessage {
    /// Provider message identifier; tool uses sharing it ran in parallel.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Vec<AssistantContent>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub(crate) enum AssistantContent {
    Text {
        #[allow(dead_code)]
        text: String,
    },
    Thinking {
        #[allow(dead_code)]
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SystemRecord {
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}
