use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use desirepath_types::CATEGORY_ENV_NEED;

// Shell interpreters whose "<shell>: <name>: not found" diagnostics we
// recognize.
static SHELL_NOT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s'(\x22\[])(?:sh|bash|zsh|dash|ksh|fish):(?:\s*line\s+\d+:)?\s*([^\s:]+):\s*(?:command\s+)?not\s+found",
    )
    .expect("valid shell-not-found pattern")
});

static COMMAND_NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)command\s+not\s+found").expect("valid pattern"));

static COMMAND_NOT_FOUND_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)command\s+not\s+found:\s*(\S+)").expect("valid pattern"));

static NO_SUCH_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)no\s+such\s+file\s+or\s+directory").expect("valid pattern"));

static EXIT_127: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)exit\s+(?:code|status)\s+127").expect("valid pattern"));

static NOT_FOUND_IN_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)not\s+found\s+in\s+PATH").expect("valid pattern"));

static NOT_FOUND_IN_PATH_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\S+):\s*not\s+found\s+in\s+PATH").expect("valid pattern"));

static NOT_INSTALLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)not\s+installed").expect("valid pattern"));

/// Classify a failed call. Only Bash failures whose error text looks like
/// a missing executable become `env-need`; everything else gets the empty
/// string.
pub fn categorize(tool_name: &str, error: &str) -> &'static str {
    if tool_name != "Bash" {
        return "";
    }

    let is_env_need = SHELL_NOT_FOUND.is_match(error)
        || COMMAND_NOT_FOUND.is_match(error)
        || NO_SUCH_FILE.is_match(error)
        || EXIT_127.is_match(error)
        || NOT_FOUND_IN_PATH.is_match(error)
        || NOT_INSTALLED.is_match(error);

    if is_env_need { CATEGORY_ENV_NEED } else { "" }
}

/// Extract the missing command name from an env-need failure.
///
/// Precedence: the shell diagnostic's capture, then
/// `command not found: <name>`, then `<name>: not found in PATH`, then
/// the first non-assignment token of the `command` field in the tool
/// input (leading `KEY=VALUE` tokens are environment assignments).
pub fn extract_command(error: &str, tool_input: Option<&Value>) -> Option<String> {
    if let Some(captures) = SHELL_NOT_FOUND.captures(error) {
        return Some(captures[1].to_string());
    }
    if let Some(captures) = COMMAND_NOT_FOUND_NAME.captures(error) {
        return Some(captures[1].to_string());
    }
    if let Some(captures) = NOT_FOUND_IN_PATH_NAME.captures(error) {
        return Some(captures[1].to_string());
    }

    let command = tool_input?.get("command")?.as_str()?;
    command
        .split_whitespace()
        .find(|token| !is_env_assignment(token))
        .map(|token| token.to_string())
}

fn is_env_assignment(token: &str) -> bool {
    match token.find('=') {
        Some(0) | None => false,
        Some(idx) => token[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bash_command_not_found_is_env_need() {
        assert_eq!(
            categorize("Bash", "bash: cargo-insta: command not found"),
            "env-need"
        );
        assert_eq!(categorize("Bash", "sh: rg: not found"), "env-need");
        assert_eq!(categorize("Bash", "process exited with exit code 127"), "env-need");
        assert_eq!(categorize("Bash", "jq: Not Found in PATH"), "env-need");
        assert_eq!(categorize("Bash", "ripgrep is not installed"), "env-need");
        assert_eq!(
            categorize("Bash", "ls: /missing: No such file or directory"),
            "env-need"
        );
    }

    #[test]
    fn test_non_bash_is_never_env_need() {
        assert_eq!(categorize("Read", "command not found"), "");
        assert_eq!(categorize("read_file", "bash: x: command not found"), "");
    }

    #[test]
    fn test_unrelated_bash_errors_are_uncategorized() {
        assert_eq!(categorize("Bash", "permission denied"), "");
        assert_eq!(categorize("Bash", "syntax error near unexpected token"), "");
    }

    #[test]
    fn test_extract_from_shell_diagnostic() {
        assert_eq!(
            extract_command("bash: cargo-insta: command not found", None),
            Some("cargo-insta".to_string())
        );
        assert_eq!(
            extract_command("zsh: line 3: delta: not found", None),
            Some("delta".to_string())
        );
    }

    #[test]
    fn test_extract_from_command_not_found_colon_form() {
        assert_eq!(
            extract_command("command not found: terraform", None),
            Some("terraform".to_string())
        );
    }

    #[test]
    fn test_extract_from_path_form() {
        assert_eq!(
            extract_command("jq: not found in PATH", None),
            Some("jq".to_string())
        );
    }

    #[test]
    fn test_extract_falls_back_to_tool_input() {
        let input = json!({"command": "FOO=1 BAR=two cargo test --workspace"});
        assert_eq!(
            extract_command("exit status 127", Some(&input)),
            Some("cargo".to_string())
        );
    }

    #[test]
    fn test_extract_without_any_source_is_none() {
        assert_eq!(extract_command("exit status 127", None), None);
        let input = json!({"description": "no command field"});
        assert_eq!(extract_command("exit status 127", Some(&input)), None);
    }
}
