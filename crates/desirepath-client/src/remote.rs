use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use desirepath_store::{CancelToken, Error, Result, Store};
use desirepath_types::{
    AliasKey, AliasRule, Desire, DesireFilter, DesireStats, Invocation, InvocationFilter,
    InvocationStats, PathDetail, PathEntry, ToolTurnStat, TurnFilter, TurnPatternStat, TurnRow,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Statuses safe to retry: the server-side handlers are idempotent
/// (duplicate identifiers fail cleanly), so a repeated POST cannot
/// double-record.
const RETRY_STATUS: [u16; 4] = [429, 502, 503, 504];

/// HTTP mirror of the storage interface (`/api/v1`, JSON bodies,
/// RFC 3339 timestamps). Transient failures retry up to three times with
/// exponential backoff starting at 100 ms.
pub struct RemoteStore {
    base_url: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The turn-stats endpoint reports both aggregate shapes in one response.
#[derive(Deserialize)]
struct TurnStatsResponse {
    #[serde(default)]
    patterns: Vec<TurnPatternStat>,
    #[serde(default)]
    tools: Vec<ToolTurnStat>,
}

impl RemoteStore {
    pub fn new(base_url: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        let mut first = true;
        for (key, value) in query {
            url.push(if first { '?' } else { '&' });
            first = false;
            url.push_str(key);
            url.push('=');
            url.push_str(&percent_encode(value));
        }
        url
    }

    /// Issue a request, retrying on network errors and the transient
    /// status set. The caller's token is observed before every attempt,
    /// so a cancellation during backoff stops the retry loop instead of
    /// re-sending. Non-retryable responses come back as-is for the
    /// caller to interpret.
    fn send_with_retry<F>(
        &self,
        cancel: &CancelToken,
        mut send: F,
    ) -> Result<ureq::http::Response<ureq::Body>>
    where
        F: FnMut() -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    {
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 1;
        loop {
            cancel.check()?;
            match send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if RETRY_STATUS.contains(&status) && attempt < MAX_ATTEMPTS {
                        std::thread::sleep(delay);
                        delay *= 2;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(_) if attempt < MAX_ATTEMPTS => {
                    std::thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(Error::Transport(err.to_string())),
            }
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        cancel: &CancelToken,
    ) -> Result<T> {
        let url = self.url(path, query);
        let mut response = self.send_with_retry(cancel, || self.agent.get(&url).call())?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(response_error(&mut response, status, None));
        }
        read_json(&mut response)
    }

    fn post_json(
        &self,
        path: &str,
        body: &impl serde::Serialize,
        id: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<()> {
        let url = self.url(path, &[]);
        let mut response = self.send_with_retry(cancel, || self.agent.post(&url).send_json(body))?;
        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(()),
            _ => Err(response_error(&mut response, status, id)),
        }
    }
}

fn read_json<T: DeserializeOwned>(response: &mut ureq::http::Response<ureq::Body>) -> Result<T> {
    response
        .body_mut()
        .read_json()
        .map_err(|err| Error::Transport(format!("bad response body: {}", err)))
}

/// Interpret a failure response. A 409 on a record endpoint is the
/// server's clean duplicate-id rejection.
fn response_error(
    response: &mut ureq::http::Response<ureq::Body>,
    status: u16,
    id: Option<&str>,
) -> Error {
    if status == 409
        && let Some(id) = id
    {
        return Error::Duplicate(id.to_string());
    }

    let message = response
        .body_mut()
        .read_json::<ErrorBody>()
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("HTTP {}", status));

    match status {
        400..=499 => Error::Invalid(message),
        _ => Error::Transport(format!("HTTP {}: {}", status, message)),
    }
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

fn alias_key_query(key: &AliasKey) -> Vec<(&'static str, String)> {
    vec![
        ("tool", key.tool.clone()),
        ("param", key.param.clone()),
        ("command", key.command.clone()),
        ("match_kind", key.match_kind.clone()),
    ]
}

fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        query.push((key, value.clone()));
    }
}

impl Store for RemoteStore {
    fn record_desire(&self, desire: &Desire, cancel: &CancelToken) -> Result<()> {
        self.post_json("/api/v1/desires", desire, Some(&desire.id), cancel)
    }

    fn list_desires(&self, filter: &DesireFilter, cancel: &CancelToken) -> Result<Vec<Desire>> {
        let mut query = Vec::new();
        push_opt(&mut query, "since", &filter.since);
        push_opt(&mut query, "source", &filter.source);
        push_opt(&mut query, "tool", &filter.tool);
        push_opt(&mut query, "category", &filter.category);
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_json("/api/v1/desires", &query, cancel)
    }

    fn get_paths(
        &self,
        since: Option<&str>,
        top: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<PathEntry>> {
        let mut query = vec![("top", top.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        self.get_json("/api/v1/paths", &query, cancel)
    }

    fn inspect_path(
        &self,
        pattern: &str,
        since: Option<&str>,
        top: usize,
        cancel: &CancelToken,
    ) -> Result<PathDetail> {
        let mut query = vec![("pattern", pattern.to_string()), ("top", top.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        self.get_json("/api/v1/inspect", &query, cancel)
    }

    fn stats(&self, cancel: &CancelToken) -> Result<DesireStats> {
        self.get_json("/api/v1/stats", &[], cancel)
    }

    fn set_alias(&self, alias: &AliasRule, cancel: &CancelToken) -> Result<()> {
        self.post_json("/api/v1/aliases", alias, None, cancel)
    }

    fn get_alias(&self, key: &AliasKey, cancel: &CancelToken) -> Result<Option<AliasRule>> {
        let path = format!("/api/v1/aliases/{}", percent_encode(&key.from));
        let url = self.url(&path, &alias_key_query(key));
        let mut response = self.send_with_retry(cancel, || self.agent.get(&url).call())?;
        match response.status().as_u16() {
            200 => Ok(Some(read_json(&mut response)?)),
            404 => Ok(None),
            status => Err(response_error(&mut response, status, None)),
        }
    }

    fn get_aliases(&self, cancel: &CancelToken) -> Result<Vec<AliasRule>> {
        self.get_json("/api/v1/aliases", &[], cancel)
    }

    fn delete_alias(&self, key: &AliasKey, cancel: &CancelToken) -> Result<bool> {
        let path = format!("/api/v1/aliases/{}", percent_encode(&key.from));
        let url = self.url(&path, &alias_key_query(key));
        let mut response = self.send_with_retry(cancel, || self.agent.delete(&url).call())?;
        match response.status().as_u16() {
            // 404 on delete means "was not there", not a failure
            200 => Ok(true),
            404 => Ok(false),
            status => Err(response_error(&mut response, status, None)),
        }
    }

    fn get_rules_for_tool(&self, tool: &str, cancel: &CancelToken) -> Result<Vec<AliasRule>> {
        self.get_json("/api/v1/aliases/rules", &[("tool", tool.to_string())], cancel)
    }

    fn record_invocation(&self, invocation: &Invocation, cancel: &CancelToken) -> Result<()> {
        self.post_json("/api/v1/invocations", invocation, Some(&invocation.id), cancel)
    }

    fn list_invocations(
        &self,
        filter: &InvocationFilter,
        cancel: &CancelToken,
    ) -> Result<Vec<Invocation>> {
        let mut query = Vec::new();
        push_opt(&mut query, "since", &filter.since);
        push_opt(&mut query, "source", &filter.source);
        push_opt(&mut query, "instance", &filter.instance);
        push_opt(&mut query, "tool", &filter.tool);
        if filter.errors_only {
            query.push(("errors_only", "true".to_string()));
        }
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_json("/api/v1/invocations", &query, cancel)
    }

    fn invocation_stats(&self, cancel: &CancelToken) -> Result<InvocationStats> {
        self.get_json("/api/v1/invocations/stats", &[], cancel)
    }

    fn list_turns(&self, filter: &TurnFilter, cancel: &CancelToken) -> Result<Vec<TurnRow>> {
        let mut query = Vec::new();
        if let Some(min_length) = filter.min_length {
            query.push(("min_length", min_length.to_string()));
        }
        push_opt(&mut query, "since", &filter.since);
        push_opt(&mut query, "session", &filter.session);
        push_opt(&mut query, "pattern", &filter.pattern);
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_json("/api/v1/turns", &query, cancel)
    }

    fn turn_pattern_stats(
        &self,
        min_length: i64,
        since: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<TurnPatternStat>> {
        Ok(self.turn_stats(min_length, since, cancel)?.patterns)
    }

    fn tool_turn_stats(
        &self,
        min_length: i64,
        since: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Vec<ToolTurnStat>> {
        Ok(self.turn_stats(min_length, since, cancel)?.tools)
    }
}

impl RemoteStore {
    fn turn_stats(
        &self,
        min_length: i64,
        since: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<TurnStatsResponse> {
        let mut query = vec![("min_length", min_length.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        self.get_json("/api/v1/turns/stats", &query, cancel)
    }
}
