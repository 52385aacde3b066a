/// Separator between tools in a canonical pattern string.
pub const PATTERN_SEPARATOR: &str = " → ";

/// Abstract a tool-name sequence into its canonical pattern string.
///
/// Runs of two or more of the same tool collapse to `Name{k+}`; single
/// occurrences stay bare. `[Grep, Read, Read, Read, Edit]` becomes
/// `Grep → Read{3+} → Edit`. The store, the analyzer and the CLI all
/// compare patterns through this one function.
pub fn canonicalize_pattern(tools: &[String]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tools.len() {
        let tool = &tools[i];
        let mut run = 1;
        while i + run < tools.len() && tools[i + run] == *tool {
            run += 1;
        }
        if run >= 2 {
            parts.push(format!("{}{{{}+}}", tool, run));
        } else {
            parts.push(tool.clone());
        }
        i += run;
    }
    parts.join(PATTERN_SEPARATOR)
}

/// First tool of a canonical pattern, with any `{k+}` suffix stripped.
pub fn pattern_first_tool(pattern: &str) -> String {
    let first = pattern
        .split(PATTERN_SEPARATOR)
        .next()
        .unwrap_or(pattern)
        .trim();
    match first.find('{') {
        Some(idx) => first[..idx].to_string(),
        None => first.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_collapses_runs() {
        let seq = tools(&["Grep", "Read", "Read", "Read", "Edit"]);
        assert_eq!(canonicalize_pattern(&seq), "Grep → Read{3+} → Edit");
    }

    #[test]
    fn test_single_tools_stay_bare() {
        let seq = tools(&["Bash"]);
        assert_eq!(canonicalize_pattern(&seq), "Bash");
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(canonicalize_pattern(&[]), "");
    }

    #[test]
    fn test_idempotent_on_canonical_output() {
        // Canonicalizing the split of a canonical string changes nothing:
        // collapsed entries are single elements and never re-collapse.
        let seq = tools(&["Read", "Read", "Bash", "Bash", "Bash", "Edit"]);
        let once = canonicalize_pattern(&seq);
        let parts: Vec<String> = once.split(PATTERN_SEPARATOR).map(String::from).collect();
        assert_eq!(canonicalize_pattern(&parts), once);
    }

    #[test]
    fn test_first_tool_strips_run_suffix() {
        assert_eq!(pattern_first_tool("Read{3+} → Edit"), "Read");
        assert_eq!(pattern_first_tool("Grep → Read{3+}"), "Grep");
        assert_eq!(pattern_first_tool("Bash"), "Bash");
        assert_eq!(pattern_first_tool(""), "");
    }
}
